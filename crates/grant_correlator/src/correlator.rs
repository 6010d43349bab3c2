//! The group-grant correlator.
//!
//! Bridges membership events and asynchronous identity resolution:
//!
//! 1. [`on_membership_added`](GroupGrantCorrelator::on_membership_added) checks
//!    the policy table, records a pending resolution and asks the resolver for
//!    the client's database id.
//! 2. Some time later, with unrelated events possibly in between,
//!    [`on_identity_resolved`](GroupGrantCorrelator::on_identity_resolved)
//!    matches the answer back to its pending record by correlation key and
//!    sends the channel-group grant to the sink.
//!
//! Per record: `AwaitingResolution -> Resolved -> Applied`, or
//! `AwaitingResolution -> Discarded` when the optional timeout evicts it.
//!
//! Handlers never fail. Every outcome is logged and counted in
//! [`CorrelatorStats`].

use crate::collaborators::{ChannelGroupGrant, GroupManagementSink, IdentityResolver, ResolveRequest};
use crate::events::{
    ClientChannelGroupChanged, DatabaseIdResolved, ServerGroupClientAdded,
    ServerGroupClientDeleted,
};
use crate::pending::{BeginOutcome, PendingRequest, PendingSummary, PendingTable, ResolutionState};
use crate::policy::GroupGrantPolicy;
use crate::stats::{CorrelatorStats, Outcome, StatsSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Tunables for the correlator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// Drop entries still awaiting resolution after this long. `None` keeps them forever.
    pub pending_timeout: Option<Duration>,
}

pub struct GroupGrantCorrelator {
    policy: Arc<GroupGrantPolicy>,
    pending: PendingTable,
    resolver: Arc<dyn IdentityResolver>,
    sink: Arc<dyn GroupManagementSink>,
    stats: CorrelatorStats,
    config: CorrelatorConfig,
}

impl GroupGrantCorrelator {
    pub fn new(
        policy: Arc<GroupGrantPolicy>,
        resolver: Arc<dyn IdentityResolver>,
        sink: Arc<dyn GroupManagementSink>,
        config: CorrelatorConfig,
    ) -> Self {
        Self {
            policy,
            pending: PendingTable::new(),
            resolver,
            sink,
            stats: CorrelatorStats::new(),
            config,
        }
    }

    /// Handles "client added to server group".
    ///
    /// Issues at most one resolve request per correlation key while one is in
    /// flight. A repeat event for the same key replaces the grant target that
    /// will be applied once the resolution arrives.
    pub async fn on_membership_added(&self, event: &ServerGroupClientAdded) {
        if event.client_unique_identity.is_empty() {
            warn!(
                connection = %event.connection,
                client_id = %event.client_id,
                "Ignoring server group event without a unique identity"
            );
            self.stats.record(Outcome::RejectedEvent);
            return;
        }

        let Some(target) = self.policy.lookup(event.server_group) else {
            trace!(
                connection = %event.connection,
                server_group = %event.server_group,
                "No grant rule for server group"
            );
            self.stats.record(Outcome::PolicyMiss);
            return;
        };

        let key = event.correlation_key();
        let request = PendingRequest {
            client_runtime_id: event.client_id,
            client_name: event.client_name.clone(),
            server_group: event.server_group,
            target,
        };

        let token = match self.pending.begin(key.clone(), request) {
            BeginOutcome::Started(token) => token,
            BeginOutcome::Updated { token, previous } => {
                debug!(
                    key = %key,
                    %token,
                    previous_channel_group = %previous.channel_group,
                    channel_group = %target.channel_group,
                    "Resolution already in flight, grant target updated"
                );
                self.stats.record(Outcome::DuplicateInFlight);
                return;
            }
        };

        info!(
            key = %key,
            %token,
            client = %event.client_name,
            client_id = %event.client_id,
            server_group = %event.server_group,
            invoker = %event.invoker.name,
            "Client joined a granting server group, resolving database id"
        );

        let resolve = ResolveRequest {
            connection: key.connection,
            client_unique_identity: key.unique_identity.clone(),
            token,
        };
        self.stats.record(Outcome::ResolveRequested);

        if let Err(e) = self.resolver.resolve_database_id(&resolve).await {
            warn!(key = %key, %token, error = %e, "Failed to submit resolve request");
            self.stats.record(Outcome::ResolverFailure);
            // Nothing is in flight any more; let the next membership event retry.
            self.pending.abandon(&key, token);
        }
    }

    /// Handles a database-id resolution response.
    ///
    /// A response with no matching pending entry is discarded.
    pub async fn on_identity_resolved(&self, event: &DatabaseIdResolved) {
        let key = event.correlation_key();

        let Some(mut record) = self.pending.take(&key) else {
            debug!(
                key = %key,
                database_id = %event.database_id,
                "Resolution with no pending request, discarding"
            );
            self.stats.record(Outcome::UnknownCorrelation);
            return;
        };

        let grant = ChannelGroupGrant {
            connection: key.connection,
            channel_group: record.target.channel_group,
            channel: record.target.channel,
            database_id: event.database_id,
            token: record.token,
        };

        match self.sink.set_client_channel_group(&grant).await {
            Ok(()) => {
                record.transition(ResolutionState::Applied);
                info!(
                    key = %key,
                    token = %record.token,
                    client = %record.client_name,
                    database_id = %grant.database_id,
                    channel_group = %grant.channel_group,
                    channel = %grant.channel,
                    "Channel group grant issued"
                );
                self.stats.record(Outcome::GrantApplied);
            }
            Err(e) => {
                record.transition(ResolutionState::Discarded);
                warn!(
                    key = %key,
                    token = %record.token,
                    database_id = %grant.database_id,
                    error = %e,
                    "Failed to submit channel group grant"
                );
                self.stats.record(Outcome::SinkFailure);
            }
        }
    }

    /// Observation point for "client removed from server group". No action.
    pub fn on_membership_removed(&self, event: &ServerGroupClientDeleted) {
        trace!(
            connection = %event.connection,
            client = %event.client_name,
            server_group = %event.server_group,
            "Server group membership removed"
        );
    }

    /// Observation point for "client channel group changed". No action.
    pub fn on_channel_group_changed(&self, event: &ClientChannelGroupChanged) {
        trace!(
            connection = %event.connection,
            client_id = %event.client_id,
            channel_group = %event.channel_group,
            channel = %event.channel,
            "Client channel group changed"
        );
    }

    /// Drops stale entries if a timeout is configured. Returns how many were evicted.
    pub fn evict_stale(&self) -> usize {
        self.evict_stale_at(Instant::now())
    }

    pub fn evict_stale_at(&self, now: Instant) -> usize {
        let Some(timeout) = self.config.pending_timeout else {
            return 0;
        };

        let evicted = self.pending.evict_stale(now, timeout);
        for record in &evicted {
            warn!(
                key = %record.key,
                token = %record.token,
                client = %record.client_name,
                age_ms = record.age(now).as_millis() as u64,
                "Identity resolution timed out, dropping pending grant"
            );
        }
        self.stats.record_n(Outcome::StaleEviction, evicted.len() as u64);
        evicted.len()
    }

    /// Drops every in-flight correlation. Used on shutdown.
    pub fn clear_pending(&self) -> usize {
        self.pending.clear()
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    pub fn pending_snapshot(&self) -> Vec<PendingSummary> {
        self.pending.snapshot()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn policy(&self) -> &GroupGrantPolicy {
        &self.policy
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CollaboratorError, CollaboratorResult};
    use crate::events::Invoker;
    use crate::types::{ClientRuntimeId, ConnectionHandle, CorrelationKey, DatabaseId, ServerGroupId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityResolver for FailingResolver {
        async fn resolve_database_id(&self, _request: &ResolveRequest) -> CollaboratorResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CollaboratorError::Disconnected)
        }
    }

    struct FailingSink;

    #[async_trait]
    impl GroupManagementSink for FailingSink {
        async fn set_client_channel_group(&self, _grant: &ChannelGroupGrant) -> CollaboratorResult<()> {
            Err(CollaboratorError::Rejected("insufficient permissions".to_string()))
        }
    }

    struct AcceptingResolver;

    #[async_trait]
    impl IdentityResolver for AcceptingResolver {
        async fn resolve_database_id(&self, _request: &ResolveRequest) -> CollaboratorResult<()> {
            Ok(())
        }
    }

    fn added(uid: &str) -> ServerGroupClientAdded {
        ServerGroupClientAdded {
            connection: ConnectionHandle(1),
            client_id: ClientRuntimeId(5),
            client_name: "Alice".to_string(),
            client_unique_identity: uid.to_string(),
            server_group: ServerGroupId(27),
            invoker: Invoker::default(),
        }
    }

    #[tokio::test]
    async fn test_resolver_failure_releases_key() {
        let resolver = Arc::new(FailingResolver { calls: AtomicUsize::new(0) });
        let correlator = GroupGrantCorrelator::new(
            Arc::new(GroupGrantPolicy::reference()),
            resolver.clone(),
            Arc::new(FailingSink),
            CorrelatorConfig::default(),
        );

        correlator.on_membership_added(&added("UID-A")).await;
        assert!(correlator.pending().is_empty());

        // The key is free again, so a later event retries.
        correlator.on_membership_added(&added("UID-A")).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(correlator.stats().resolver_failures, 2);
    }

    #[tokio::test]
    async fn test_sink_failure_is_counted_and_entry_removed() {
        let correlator = GroupGrantCorrelator::new(
            Arc::new(GroupGrantPolicy::reference()),
            Arc::new(AcceptingResolver),
            Arc::new(FailingSink),
            CorrelatorConfig::default(),
        );

        correlator.on_membership_added(&added("UID-A")).await;
        correlator
            .on_identity_resolved(&DatabaseIdResolved {
                connection: ConnectionHandle(1),
                client_unique_identity: "UID-A".to_string(),
                database_id: DatabaseId(9001),
            })
            .await;

        let stats = correlator.stats();
        assert_eq!(stats.sink_failures, 1);
        assert_eq!(stats.grants_applied, 0);
        assert!(!correlator
            .pending()
            .contains(&CorrelationKey::new(ConnectionHandle(1), "UID-A")));
    }

    #[tokio::test]
    async fn test_empty_identity_rejected() {
        let correlator = GroupGrantCorrelator::new(
            Arc::new(GroupGrantPolicy::reference()),
            Arc::new(AcceptingResolver),
            Arc::new(FailingSink),
            CorrelatorConfig::default(),
        );

        correlator.on_membership_added(&added("")).await;

        let stats = correlator.stats();
        assert_eq!(stats.rejected_events, 1);
        assert_eq!(stats.resolve_requests, 0);
        assert!(correlator.pending().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_disabled_without_timeout() {
        let correlator = GroupGrantCorrelator::new(
            Arc::new(GroupGrantPolicy::reference()),
            Arc::new(AcceptingResolver),
            Arc::new(FailingSink),
            CorrelatorConfig::default(),
        );

        correlator.on_membership_added(&added("UID-A")).await;
        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(correlator.evict_stale_at(later), 0);
        assert_eq!(correlator.pending().len(), 1);
    }
}
