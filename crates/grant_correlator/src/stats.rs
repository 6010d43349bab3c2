//! Operability counters for the correlator.
//!
//! One counter per outcome kind, readable at any time without locking.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`CorrelatorStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub policy_misses: u64,
    pub duplicate_in_flight: u64,
    pub unknown_correlations: u64,
    pub stale_evictions: u64,
    pub resolve_requests: u64,
    pub grants_applied: u64,
    pub resolver_failures: u64,
    pub sink_failures: u64,
    pub rejected_events: u64,
}

/// Live counters.
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    policy_misses: AtomicU64,
    duplicate_in_flight: AtomicU64,
    unknown_correlations: AtomicU64,
    stale_evictions: AtomicU64,
    resolve_requests: AtomicU64,
    grants_applied: AtomicU64,
    resolver_failures: AtomicU64,
    sink_failures: AtomicU64,
    rejected_events: AtomicU64,
}

/// Which counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PolicyMiss,
    DuplicateInFlight,
    UnknownCorrelation,
    StaleEviction,
    ResolveRequested,
    GrantApplied,
    ResolverFailure,
    SinkFailure,
    RejectedEvent,
}

impl CorrelatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&self, outcome: Outcome) {
        self.record_n(outcome, 1);
    }

    pub fn record_n(&self, outcome: Outcome, n: u64) {
        let counter = match outcome {
            Outcome::PolicyMiss => &self.policy_misses,
            Outcome::DuplicateInFlight => &self.duplicate_in_flight,
            Outcome::UnknownCorrelation => &self.unknown_correlations,
            Outcome::StaleEviction => &self.stale_evictions,
            Outcome::ResolveRequested => &self.resolve_requests,
            Outcome::GrantApplied => &self.grants_applied,
            Outcome::ResolverFailure => &self.resolver_failures,
            Outcome::SinkFailure => &self.sink_failures,
            Outcome::RejectedEvent => &self.rejected_events,
        };
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            policy_misses: self.policy_misses.load(Ordering::Relaxed),
            duplicate_in_flight: self.duplicate_in_flight.load(Ordering::Relaxed),
            unknown_correlations: self.unknown_correlations.load(Ordering::Relaxed),
            stale_evictions: self.stale_evictions.load(Ordering::Relaxed),
            resolve_requests: self.resolve_requests.load(Ordering::Relaxed),
            grants_applied: self.grants_applied.load(Ordering::Relaxed),
            resolver_failures: self.resolver_failures.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            rejected_events: self.rejected_events.load(Ordering::Relaxed),
        }
    }
}
