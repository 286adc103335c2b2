//! Live counters shared by all workers of a run

use crate::types::{DownloadResult, Outcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    peak_active: AtomicUsize,
    succeeded: AtomicUsize,
    already_existed: AtomicUsize,
    failed: AtomicUsize,
    bytes_transferred: AtomicU64,
}

/// Lock-free run counters (cloning shares the same counters)
#[derive(Clone, Debug, Default)]
pub struct RunStats {
    inner: Arc<Counters>,
}

/// Point-in-time copy of [`RunStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Tasks currently being processed
    pub active: usize,
    /// Highest number of tasks processed at the same time
    pub peak_active: usize,
    /// Tasks downloaded
    pub succeeded: usize,
    /// Tasks skipped because the archive was already present
    pub already_existed: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Bytes written so far
    pub bytes_transferred: u64,
}

impl StatsSnapshot {
    /// Tasks that reached a final outcome
    pub fn finished(&self) -> usize {
        self.succeeded + self.already_existed + self.failed
    }
}

/// Marks a task as active until dropped
pub(crate) struct ActiveGuard {
    inner: Arc<Counters>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RunStats {
    pub(crate) fn begin_task(&self) -> ActiveGuard {
        let now = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_active.fetch_max(now, Ordering::SeqCst);
        ActiveGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.inner
            .bytes_transferred
            .fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, result: &DownloadResult) {
        let counter = match result.outcome {
            Outcome::Success => &self.inner.succeeded,
            Outcome::AlreadyExists => &self.inner.already_existed,
            Outcome::Failed => &self.inner.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            active: self.inner.active.load(Ordering::SeqCst),
            peak_active: self.inner.peak_active.load(Ordering::SeqCst),
            succeeded: self.inner.succeeded.load(Ordering::Relaxed),
            already_existed: self.inner.already_existed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            bytes_transferred: self.inner.bytes_transferred.load(Ordering::Relaxed),
        }
    }
}
