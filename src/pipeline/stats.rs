//! Counters describing what happened to submitted records.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free pipeline counters, shared by the gate and every worker.
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    rejected: AtomicU64,
    dropped_invalid: AtomicU64,
    stored: AtomicU64,
    storage_failures: AtomicU64,
    abandoned: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Records accepted by the submission gate.
    pub submitted: u64,
    /// Submissions refused because the ingress queue was full.
    pub rejected: u64,
    /// Records discarded by the validate stage.
    pub dropped_invalid: u64,
    /// Records that reached the sink and were written to the indexed store.
    pub stored: u64,
    /// Store or log writes that failed at the sink.
    pub storage_failures: u64,
    /// Records a worker let go of because cancellation fired.
    pub abandoned: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_invalid(&self) {
        self.dropped_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}
