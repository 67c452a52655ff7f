//! Engine statistics.
//!
//! Counters are atomic and can be read while transactions are running.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters kept by an engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Transactions created.
    transactions_opened: AtomicU64,
    /// Transactions that completed.
    transactions_committed: AtomicU64,
    /// Transactions that aborted.
    transactions_aborted: AtomicU64,
    /// Requests processed (including failed ones).
    requests_processed: AtomicU64,
    /// Records a cursor was positioned on.
    cursor_visits: AtomicU64,
}

impl EngineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self) {
        self.transactions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.transactions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cursor_visit(&self) {
        self.cursor_visits.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transactions_opened: self.transactions_opened.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_aborted: self.transactions_aborted.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            cursor_visits: self.cursor_visits.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`EngineStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Transactions created.
    pub transactions_opened: u64,
    /// Transactions that completed.
    pub transactions_committed: u64,
    /// Transactions that aborted.
    pub transactions_aborted: u64,
    /// Requests processed.
    pub requests_processed: u64,
    /// Records a cursor was positioned on.
    pub cursor_visits: u64,
}

impl StatsSnapshot {
    /// Counter differences since an earlier snapshot.
    #[must_use]
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            transactions_opened: self.transactions_opened - earlier.transactions_opened,
            transactions_committed: self.transactions_committed - earlier.transactions_committed,
            transactions_aborted: self.transactions_aborted - earlier.transactions_aborted,
            requests_processed: self.requests_processed - earlier.requests_processed,
            cursor_visits: self.cursor_visits - earlier.cursor_visits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_and_delta() {
        let stats = EngineStats::new();
        stats.record_open();
        let before = stats.snapshot();
        stats.record_open();
        stats.record_commit();
        stats.record_cursor_visit();

        let delta = stats.snapshot().since(&before);
        assert_eq!(delta.transactions_opened, 1);
        assert_eq!(delta.transactions_committed, 1);
        assert_eq!(delta.cursor_visits, 1);
        assert_eq!(delta.transactions_aborted, 0);
    }
}
