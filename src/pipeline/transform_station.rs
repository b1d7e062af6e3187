//! Transform station: stamps a content checksum and the transform time.

use crate::defaults::{PLACEHOLDER_CHECKSUM, keys};
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::ChunkRecord;
use std::sync::Arc;

/// Computes the checksum recorded for a payload.
pub trait ContentHasher: Send + Sync {
    fn checksum(&self, payload: &[u8]) -> String;
}

/// Returns a fixed token regardless of content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderHasher;

impl ContentHasher for PlaceholderHasher {
    fn checksum(&self, _payload: &[u8]) -> String {
        PLACEHOLDER_CHECKSUM.to_string()
    }
}

#[derive(Clone)]
pub struct TransformStation {
    hasher: Arc<dyn ContentHasher>,
    clock: Arc<dyn Clock>,
}

impl TransformStation {
    pub fn new(hasher: Arc<dyn ContentHasher>) -> Self {
        Self::with_clock(hasher, Arc::new(SystemClock))
    }

    pub fn with_clock(hasher: Arc<dyn ContentHasher>, clock: Arc<dyn Clock>) -> Self {
        Self { hasher, clock }
    }
}

impl Default for TransformStation {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderHasher))
    }
}

impl Station for TransformStation {
    type Input = ChunkRecord;
    type Output = ChunkRecord;

    fn name(&self) -> &'static str {
        "transform"
    }

    fn process(&mut self, mut record: ChunkRecord) -> Result<Option<ChunkRecord>, StationError> {
        let checksum = self.hasher.checksum(record.payload());
        record.annotate(keys::CHECKSUM, checksum);
        record.annotate(keys::TRANSFORMED_AT, self.clock.rfc3339());
        Ok(Some(record))
    }
}
