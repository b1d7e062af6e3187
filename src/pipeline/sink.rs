//! Terminal station that commits finished records to storage.

use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::types::ChunkRecord;
use crate::storage::ChunkStore;
use std::sync::Arc;

/// Saves every record to the queryable store, then to the durable log.
///
/// Failures are never retried. They surface only as a recoverable station
/// error, which the pipeline's reporter logs.
#[derive(Clone)]
pub struct SinkStation {
    store: Arc<dyn ChunkStore>,
    log: Arc<dyn ChunkStore>,
    stats: Arc<PipelineStats>,
}

impl SinkStation {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        log: Arc<dyn ChunkStore>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self { store, log, stats }
    }
}

impl Station for SinkStation {
    type Input = ChunkRecord;
    type Output = ();

    fn name(&self) -> &'static str {
        "sink"
    }

    fn process(&mut self, record: ChunkRecord) -> Result<Option<()>, StationError> {
        let record = Arc::new(record);
        let mut failures = Vec::new();

        match self.store.save(Arc::clone(&record)) {
            Ok(()) => self.stats.record_stored(),
            Err(e) => failures.push(format!("{}: {}", self.store.name(), e)),
        }

        if let Err(e) = self.log.save(Arc::clone(&record)) {
            failures.push(format!("{}: {}", self.log.name(), e));
        }

        if failures.is_empty() {
            return Ok(None);
        }

        for _ in &failures {
            self.stats.record_storage_failure();
        }
        Err(StationError::Recoverable(format!(
            "saving chunk {} failed ({})",
            record.id(),
            failures.join("; ")
        )))
    }
}
