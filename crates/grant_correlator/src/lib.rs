//! # Grant Correlator
//!
//! Grants a channel group to a client when it is observed joining a server
//! group. The grant needs the client's persistent database id, which only an
//! asynchronous lookup can provide, so the crate's job is to correlate:
//!
//! ```text
//! membership added ──► policy lookup ──► pending table ──► resolve request
//!                                             │
//! identity resolved ──────────────────────────┴──► channel group grant
//! ```
//!
//! ## Key pieces
//!
//! - [`GroupGrantPolicy`] - read-only map from server group to grant target
//! - [`PendingTable`] - in-flight workflows keyed by [`CorrelationKey`]
//! - [`IdentityResolver`] / [`GroupManagementSink`] - the external services
//! - [`GroupGrantCorrelator`] - the event handlers tying it together
//!
//! ## Guarantees
//!
//! - Responses are matched by `(connection, unique identity)`, never by call order
//!   or by the transient runtime client id.
//! - At most one resolve request is in flight per correlation key.
//! - A response is applied at most once; a second one for the same key is
//!   treated as unknown.
//! - Handlers never return errors. Outcomes are logged and counted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use grant_correlator::*;
//! use std::sync::Arc;
//!
//! struct Resolver;
//! struct Sink;
//!
//! #[async_trait::async_trait]
//! impl IdentityResolver for Resolver {
//!     async fn resolve_database_id(&self, request: &ResolveRequest) -> CollaboratorResult<()> {
//!         println!("resolve {}", request.client_unique_identity);
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl GroupManagementSink for Sink {
//!     async fn set_client_channel_group(&self, grant: &ChannelGroupGrant) -> CollaboratorResult<()> {
//!         println!("grant {} in {}", grant.channel_group, grant.channel);
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() {
//! let correlator = GroupGrantCorrelator::new(
//!     Arc::new(GroupGrantPolicy::reference()),
//!     Arc::new(Resolver),
//!     Arc::new(Sink),
//!     CorrelatorConfig::default(),
//! );
//!
//! correlator
//!     .on_identity_resolved(&DatabaseIdResolved {
//!         connection: ConnectionHandle(1),
//!         client_unique_identity: "UID-A".to_string(),
//!         database_id: DatabaseId(9001),
//!     })
//!     .await;
//! # }
//! ```

pub mod collaborators;
pub mod correlator;
pub mod error;
pub mod events;
pub mod pending;
pub mod policy;
pub mod stats;
pub mod types;

pub use collaborators::{ChannelGroupGrant, GroupManagementSink, IdentityResolver, ResolveRequest};
pub use correlator::{CorrelatorConfig, GroupGrantCorrelator};
pub use error::{CollaboratorError, CollaboratorResult, PolicyError, PolicyResult};
pub use events::{
    ClientChannelGroupChanged, DatabaseIdResolved, Invoker, ServerGroupClientAdded,
    ServerGroupClientDeleted,
};
pub use pending::{
    BeginOutcome, PendingRequest, PendingResolution, PendingSummary, PendingTable,
    ResolutionState,
};
pub use policy::{GrantRule, GrantTarget, GroupGrantPolicy};
pub use stats::{CorrelatorStats, Outcome, StatsSnapshot};
pub use types::{
    ChannelGroupId, ChannelId, ClientRuntimeId, ConnectionHandle, CorrelationKey, DatabaseId,
    RequestToken, ServerGroupId,
};
