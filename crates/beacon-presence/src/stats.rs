//! Backend call counters.
//!
//! Backend failures are deliberately swallowed (the relay stays up and
//! presence degrades to the in-memory view), so without a counter they
//! would be invisible in production. These atomics are the
//! observability hook for that policy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for backend traffic and failures.
#[derive(Debug, Default)]
pub struct BackendStats {
    status_writes: AtomicU64,
    friend_queries: AtomicU64,
    credential_refreshes: AtomicU64,
    failures: AtomicU64,
}

impl BackendStats {
    pub(crate) fn record_status_write(&self) {
        self.status_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_friend_query(&self) {
        self.friend_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self) {
        self.credential_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            status_writes: self.status_writes.load(Ordering::Relaxed),
            friend_queries: self.friend_queries.load(Ordering::Relaxed),
            credential_refreshes: self.credential_refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain-data snapshot of [`BackendStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// `set_online_status` calls attempted.
    pub status_writes: u64,
    /// `get_online_friends` calls attempted.
    pub friend_queries: u64,
    /// `refresh_credential` calls attempted.
    pub credential_refreshes: u64,
    /// Backend calls of any kind that failed.
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = BackendStats::default();
        stats.record_status_write();
        stats.record_status_write();
        stats.record_friend_query();
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.status_writes, 2);
        assert_eq!(snap.friend_queries, 1);
        assert_eq!(snap.credential_refreshes, 0);
        assert_eq!(snap.failures, 1);
    }
}
