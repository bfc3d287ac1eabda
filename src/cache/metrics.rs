//! Counters for the cache's background work

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals since the cache was created
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Delta cycles that completed fetch, merge and reconcile
    pub cycles: AtomicU64,

    /// Delta cycles abandoned on error
    pub failed_cycles: AtomicU64,

    /// Full refetches triggered by a count mismatch
    pub refetches: AtomicU64,

    /// Whole snapshots installed from a full fetch
    pub full_installs: AtomicU64,

    /// Compare-and-swap attempts that lost a race and retried
    pub cas_retries: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            full_installs: self.full_installs.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub refetches: u64,
    pub full_installs: u64,
    pub cas_retries: u64,
}
