//! # Core Type Definitions
//!
//! Identifier newtypes shared by the correlator, its collaborators and the host.
//!
//! ## Key Types
//!
//! - [`ConnectionHandle`] - the control-plane session an event arrived on
//! - [`ClientRuntimeId`] - transient per-connection client number
//! - [`DatabaseId`] - persistent numeric identity returned by the resolver
//! - [`CorrelationKey`] - the `(connection, unique identity)` pair a response is matched by
//! - [`RequestToken`] - per-workflow token passed along with outbound requests
//!
//! Wrapper types keep a channel id from being handed where a channel group id
//! is expected. All of them serialize as their bare inner value.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Opaque identifier of the control-plane session an event was delivered on.
    ConnectionHandle(u64)
);

numeric_id!(
    /// Transient client number, only meaningful for the lifetime of one client session.
    ///
    /// Never used for correlation or for the grant call; it may be reassigned
    /// while an identity resolution is in flight.
    ClientRuntimeId(u16)
);

numeric_id!(
    /// Server group whose membership change triggers policy evaluation.
    ServerGroupId(u64)
);

numeric_id!(
    /// Channel group granted by a policy rule.
    ChannelGroupId(u64)
);

numeric_id!(
    /// Channel in which a channel group is granted.
    ChannelId(u64)
);

numeric_id!(
    /// Persistent database identifier resolved from a client's unique identity.
    DatabaseId(u64)
);

/// Key used to match an identity-resolution response to the request that caused it.
///
/// Built from the connection and the client's stable unique identity; the
/// runtime client id is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub connection: ConnectionHandle,
    pub unique_identity: String,
}

impl CorrelationKey {
    pub fn new(connection: ConnectionHandle, unique_identity: impl Into<String>) -> Self {
        Self {
            connection,
            unique_identity: unique_identity.into(),
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection, self.unique_identity)
    }
}

/// Token identifying one resolve-then-grant workflow.
///
/// Passed to the resolver and the sink as the optional correlation token so
/// host-side logs can be joined with ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub Uuid);

impl RequestToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
