//! Non-blocking entry point into the pipeline.

use crate::pipeline::error::SubmitError;
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::ChunkRecord;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;

/// Cheap, cloneable handle that transports use to hand records to the pipeline.
///
/// `submit` never blocks: a full ingress queue is reported as
/// [`SubmitError::Backpressure`] and the caller decides whether to retry.
/// Acceptance is the last thing the caller hears about a record.
#[derive(Clone)]
pub struct SubmissionGate {
    tx: Sender<ChunkRecord>,
    stats: Arc<PipelineStats>,
}

impl SubmissionGate {
    pub(crate) fn new(tx: Sender<ChunkRecord>, stats: Arc<PipelineStats>) -> Self {
        Self { tx, stats }
    }

    pub fn submit(&self, record: ChunkRecord) -> Result<(), SubmitError> {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_rejected();
                Err(SubmitError::Backpressure)
            }
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Closed),
        }
    }

    /// Records currently waiting in the ingress queue.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Capacity of the ingress queue.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}
