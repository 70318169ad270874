use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Publish counters, updated lock-free from the publishing threads and
/// the completion tasks.
#[derive(Debug, Default)]
pub struct PublisherStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Sends enqueued but not yet completed.
    pub in_flight: u64,
}

impl PublisherStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, success: bool) {
        if success {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn in_flight(&self) -> u64 {
        // Completions first: a completion never precedes its acceptance.
        let completed = self.delivered.load(Ordering::Acquire) + self.failed.load(Ordering::Acquire);
        self.accepted.load(Ordering::Acquire).saturating_sub(completed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let accepted = self.accepted.load(Ordering::Relaxed);
        StatsSnapshot {
            accepted,
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered,
            failed,
            in_flight: accepted.saturating_sub(delivered + failed),
        }
    }
}
