//! Statistics for funnel runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker of a funnel.
///
/// Updated with relaxed atomics from the worker threads; read through
/// [`snapshot`](Self::snapshot).
#[derive(Debug)]
pub struct FunnelStats {
    started_at: DateTime<Utc>,
    jobs_succeeded: AtomicU64,
    jobs_skipped: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_unexpected: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    resets: AtomicU64,
    bytes_transferred: AtomicU64,
}

impl Default for FunnelStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FunnelStats {
    /// Create zeroed statistics starting now.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            jobs_succeeded: AtomicU64::new(0),
            jobs_skipped: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_unexpected: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            resets: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
        }
    }

    /// Record a job that completed its transfer.
    pub fn record_success(&self, bytes: u64) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a put skipped because the remote content was unchanged.
    pub fn record_skipped(&self) {
        self.jobs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job that ended in an expected failure.
    pub fn record_failure(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job that ended in an unexpected error.
    pub fn record_unexpected(&self) {
        self.jobs_unexpected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one attempt of any job.
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a job will try again.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a toolbox reset.
    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            captured_at: Utc::now(),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_skipped: self.jobs_skipped.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_unexpected: self.jobs_unexpected.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FunnelStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    pub jobs_succeeded: u64,
    pub jobs_skipped: u64,
    pub jobs_failed: u64,
    pub jobs_unexpected: u64,
    pub attempts: u64,
    pub retries: u64,
    pub resets: u64,
    pub bytes_transferred: u64,
}

impl StatsSnapshot {
    /// Jobs that reached a terminal state.
    pub fn jobs_total(&self) -> u64 {
        self.jobs_succeeded + self.jobs_skipped + self.jobs_failed + self.jobs_unexpected
    }

    /// Jobs that ended in success, including skipped uploads.
    pub fn jobs_ok(&self) -> u64 {
        self.jobs_succeeded + self.jobs_skipped
    }

    /// Time between the funnel starting and this snapshot.
    pub fn duration(&self) -> Duration {
        self.captured_at - self.started_at
    }
}
