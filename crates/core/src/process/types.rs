//! Types for the process orchestrator.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of a [`Process`](super::Process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Producers may still be pushing jobs.
    Running,
    /// The queue has closed; pending kills are being acknowledged.
    Draining,
    /// The consumer has finished.
    Stopped,
}

/// Counters updated by the consumer.
#[derive(Debug, Default)]
pub(crate) struct ProcessStats {
    pub received: AtomicU64,
    pub skipped: AtomicU64,
    pub check_errors: AtomicU64,
    pub executed: AtomicU64,
    pub execute_errors: AtomicU64,
    pub watchers_closed: AtomicU64,
}

impl ProcessStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn to_summary(&self) -> ProcessSummary {
        ProcessSummary {
            received: self.received.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            check_errors: self.check_errors.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            execute_errors: self.execute_errors.load(Ordering::Relaxed),
            watchers_closed: self.watchers_closed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of what the consumer has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// Jobs taken off the queue.
    pub received: u64,
    /// Jobs dropped by an expected check failure.
    pub skipped: u64,
    /// Jobs dropped by an unexpected check error.
    pub check_errors: u64,
    /// Jobs whose execute phase succeeded.
    pub executed: u64,
    /// Jobs whose execute phase failed.
    pub execute_errors: u64,
    /// Watchers closed by a kill.
    pub watchers_closed: u64,
}
