//! Inbound event payloads delivered by the membership and identity services.
//!
//! Field names follow the host's callback arguments so the JSON form of each
//! event can be produced directly from a callback invocation.

use crate::types::{
    ChannelGroupId, ChannelId, ClientRuntimeId, ConnectionHandle, CorrelationKey, DatabaseId,
    ServerGroupId,
};
use serde::{Deserialize, Serialize};

/// The client (or server, id 0) that caused a membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoker {
    pub id: ClientRuntimeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unique_identity: String,
}

/// A client was added to a server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroupClientAdded {
    pub connection: ConnectionHandle,
    pub client_id: ClientRuntimeId,
    #[serde(default)]
    pub client_name: String,
    pub client_unique_identity: String,
    pub server_group: ServerGroupId,
    #[serde(default)]
    pub invoker: Invoker,
}

impl ServerGroupClientAdded {
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.connection, self.client_unique_identity.clone())
    }
}

/// A client was removed from a server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroupClientDeleted {
    pub connection: ConnectionHandle,
    pub client_id: ClientRuntimeId,
    #[serde(default)]
    pub client_name: String,
    pub client_unique_identity: String,
    pub server_group: ServerGroupId,
    #[serde(default)]
    pub invoker: Invoker,
}

/// A client's channel group changed, including changes we caused ourselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientChannelGroupChanged {
    pub connection: ConnectionHandle,
    pub channel_group: ChannelGroupId,
    pub channel: ChannelId,
    pub client_id: ClientRuntimeId,
    #[serde(default)]
    pub invoker: Invoker,
}

/// Completion of an identity-resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseIdResolved {
    pub connection: ConnectionHandle,
    pub client_unique_identity: String,
    pub database_id: DatabaseId,
}

impl DatabaseIdResolved {
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.connection, self.client_unique_identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_event_from_host_json() {
        let event: ServerGroupClientAdded = serde_json::from_value(serde_json::json!({
            "connection": 1,
            "client_id": 5,
            "client_name": "Alice",
            "client_unique_identity": "UID-A",
            "server_group": 27,
            "invoker": { "id": 2, "name": "Admin", "unique_identity": "UID-ADMIN" }
        }))
        .unwrap();

        assert_eq!(event.server_group, ServerGroupId(27));
        assert_eq!(event.invoker.name, "Admin");
        assert_eq!(
            event.correlation_key(),
            CorrelationKey::new(ConnectionHandle(1), "UID-A")
        );
    }

    #[test]
    fn test_invoker_is_optional() {
        let event: ServerGroupClientDeleted = serde_json::from_value(serde_json::json!({
            "connection": 3,
            "client_id": 9,
            "client_unique_identity": "UID-B",
            "server_group": 4
        }))
        .unwrap();

        assert_eq!(event.invoker, Invoker::default());
        assert!(event.client_name.is_empty());
    }
}
