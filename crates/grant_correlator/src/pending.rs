//! Pending-resolution table
//!
//! Tracks every in-flight "resolve identity, then grant" workflow, keyed by
//! [`CorrelationKey`]. All mutation goes through operations that complete
//! under a single shard lock, so no caller can observe or produce a
//! half-updated record:
//!
//! - [`PendingTable::begin`] inserts if absent, otherwise updates in place
//! - [`PendingTable::take`] removes atomically
//! - [`PendingTable::abandon`] removes only the workflow that owns a token
//! - [`PendingTable::evict_stale`] drops entries whose resolver never answered

use crate::policy::GrantTarget;
use crate::types::{ClientRuntimeId, CorrelationKey, RequestToken, ServerGroupId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle state of a pending resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    AwaitingResolution,
    Resolved,
    Applied,
    Discarded,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Discarded)
    }
}

/// One in-flight correlation record.
#[derive(Debug, Clone)]
pub struct PendingResolution {
    pub token: RequestToken,
    pub key: CorrelationKey,
    /// Runtime id at event time, kept for diagnostics only.
    pub client_runtime_id: ClientRuntimeId,
    pub client_name: String,
    pub server_group: ServerGroupId,
    pub target: GrantTarget,
    pub state: ResolutionState,
    /// When the resolve request was issued. Not refreshed by duplicate events.
    pub requested_at: Instant,
    /// How many membership events have been folded into this record.
    pub event_count: u32,
}

impl PendingResolution {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.requested_at)
    }

    pub(crate) fn transition(&mut self, next: ResolutionState) {
        debug_assert!(!self.state.is_terminal(), "transition out of terminal state");
        self.state = next;
    }
}

/// Fields describing a membership event that matched the policy.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub client_runtime_id: ClientRuntimeId,
    pub client_name: String,
    pub server_group: ServerGroupId,
    pub target: GrantTarget,
}

/// Result of [`PendingTable::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// No workflow existed for the key; a resolve request must be issued.
    Started(RequestToken),
    /// A workflow was already awaiting resolution; its grant target was replaced.
    Updated {
        token: RequestToken,
        previous: GrantTarget,
    },
}

/// Serializable view of a pending entry for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSummary {
    pub key: CorrelationKey,
    pub token: RequestToken,
    pub server_group: ServerGroupId,
    pub target: GrantTarget,
    pub age_ms: u64,
}

/// Concurrent table of pending resolutions.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: DashMap<CorrelationKey, PendingResolution>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new workflow for `key`, or folds the request into the existing one.
    pub fn begin(&self, key: CorrelationKey, request: PendingRequest) -> BeginOutcome {
        self.begin_at(key, request, Instant::now())
    }

    pub(crate) fn begin_at(
        &self,
        key: CorrelationKey,
        request: PendingRequest,
        now: Instant,
    ) -> BeginOutcome {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let previous = record.target;
                record.target = request.target;
                record.server_group = request.server_group;
                record.client_runtime_id = request.client_runtime_id;
                record.client_name = request.client_name;
                record.event_count += 1;
                BeginOutcome::Updated {
                    token: record.token,
                    previous,
                }
            }
            Entry::Vacant(vacant) => {
                let token = RequestToken::new();
                let record = PendingResolution {
                    token,
                    key: vacant.key().clone(),
                    client_runtime_id: request.client_runtime_id,
                    client_name: request.client_name,
                    server_group: request.server_group,
                    target: request.target,
                    state: ResolutionState::AwaitingResolution,
                    requested_at: now,
                    event_count: 1,
                };
                vacant.insert(record);
                BeginOutcome::Started(token)
            }
        }
    }

    /// Removes the workflow for `key`, moving it to [`ResolutionState::Resolved`].
    ///
    /// Once this returns `Some`, a second response for the same key finds nothing.
    pub fn take(&self, key: &CorrelationKey) -> Option<PendingResolution> {
        self.entries.remove(key).map(|(_, mut record)| {
            record.transition(ResolutionState::Resolved);
            record
        })
    }

    /// Removes the workflow for `key` only if it is still the one identified by `token`.
    pub fn abandon(&self, key: &CorrelationKey, token: RequestToken) -> Option<PendingResolution> {
        self.entries
            .remove_if(key, |_, record| record.token == token)
            .map(|(_, mut record)| {
                record.transition(ResolutionState::Discarded);
                record
            })
    }

    /// Removes and returns every entry still awaiting resolution after `timeout`.
    pub fn evict_stale(&self, now: Instant, timeout: Duration) -> Vec<PendingResolution> {
        let mut evicted = Vec::new();
        self.entries.retain(|_, record| {
            let stale = record.state == ResolutionState::AwaitingResolution
                && record.age(now) >= timeout;
            if stale {
                let mut discarded = record.clone();
                discarded.transition(ResolutionState::Discarded);
                evicted.push(discarded);
            }
            !stale
        });
        evicted
    }

    pub fn contains(&self, key: &CorrelationKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &CorrelationKey) -> Option<PendingResolution> {
        self.entries.get(key).map(|record| record.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, returning how many were in flight.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn snapshot(&self) -> Vec<PendingSummary> {
        let now = Instant::now();
        let mut summaries: Vec<PendingSummary> = self
            .entries
            .iter()
            .map(|record| PendingSummary {
                key: record.key.clone(),
                token: record.token,
                server_group: record.server_group,
                target: record.target,
                age_ms: record.age(now).as_millis() as u64,
            })
            .collect();
        summaries.sort_by(|a, b| b.age_ms.cmp(&a.age_ms));
        summaries
    }
}
