//! Outbound collaborator interfaces.
//!
//! Both calls are fire-and-forget: `Ok(())` means the request was submitted,
//! not that it succeeded. The resolver's answer comes back later through
//! [`GroupGrantCorrelator::on_identity_resolved`](crate::GroupGrantCorrelator::on_identity_resolved);
//! the sink's outcome is never observed.

use crate::error::CollaboratorResult;
use crate::types::{ChannelGroupId, ChannelId, ConnectionHandle, DatabaseId, RequestToken};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request to translate a unique identity into a database id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub connection: ConnectionHandle,
    pub client_unique_identity: String,
    pub token: RequestToken,
}

/// Request to set a client's channel group in one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGroupGrant {
    pub connection: ConnectionHandle,
    pub channel_group: ChannelGroupId,
    pub channel: ChannelId,
    pub database_id: DatabaseId,
    pub token: RequestToken,
}

/// Asynchronous identity lookup.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn resolve_database_id(&self, request: &ResolveRequest) -> CollaboratorResult<()>;
}

/// Receiver of channel-group grants.
///
/// Treated as idempotent: granting a group the client already holds is harmless.
#[async_trait]
pub trait GroupManagementSink: Send + Sync + 'static {
    async fn set_client_channel_group(&self, grant: &ChannelGroupGrant) -> CollaboratorResult<()>;
}
