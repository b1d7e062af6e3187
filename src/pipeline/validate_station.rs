//! Entry stations: ingest hand-off and field validation.

use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::ChunkRecord;
use std::sync::Arc;

/// Moves records from the ingress queue onto the validate queue unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStation;

impl Station for IngestStation {
    type Input = ChunkRecord;
    type Output = ChunkRecord;

    fn name(&self) -> &'static str {
        "ingest"
    }

    fn process(&mut self, record: ChunkRecord) -> Result<Option<ChunkRecord>, StationError> {
        Ok(Some(record))
    }
}

/// Assigns missing identifiers and discards records with empty required fields.
///
/// A discarded record is only counted. The submitter already got its
/// acknowledgment and hears nothing further.
#[derive(Clone)]
pub struct ValidateStation {
    stats: Arc<PipelineStats>,
}

impl ValidateStation {
    pub fn new(stats: Arc<PipelineStats>) -> Self {
        Self { stats }
    }
}

/// Returns true if the record carries everything downstream stages need.
pub fn is_admissible(record: &ChunkRecord) -> bool {
    !record.submitter_id().is_empty()
        && !record.session_id().is_empty()
        && !record.payload().is_empty()
}

impl Station for ValidateStation {
    type Input = ChunkRecord;
    type Output = ChunkRecord;

    fn name(&self) -> &'static str {
        "validate"
    }

    fn process(&mut self, mut record: ChunkRecord) -> Result<Option<ChunkRecord>, StationError> {
        record.ensure_id();

        if !is_admissible(&record) {
            self.stats.record_dropped_invalid();
            return Ok(None);
        }

        Ok(Some(record))
    }
}
