//! Metadata extraction station: stamps a transcript and the extraction time.

use crate::defaults::{PLACEHOLDER_TRANSCRIPT, keys};
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::ChunkRecord;
use std::sync::Arc;

/// Produces a transcript for a payload.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, payload: &[u8]) -> String;
}

/// Returns a fixed transcript regardless of content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTranscriber;

impl Transcriber for PlaceholderTranscriber {
    fn transcribe(&self, _payload: &[u8]) -> String {
        PLACEHOLDER_TRANSCRIPT.to_string()
    }
}

#[derive(Clone)]
pub struct MetadataStation {
    transcriber: Arc<dyn Transcriber>,
    clock: Arc<dyn Clock>,
}

impl MetadataStation {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self::with_clock(transcriber, Arc::new(SystemClock))
    }

    pub fn with_clock(transcriber: Arc<dyn Transcriber>, clock: Arc<dyn Clock>) -> Self {
        Self { transcriber, clock }
    }
}

impl Default for MetadataStation {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderTranscriber))
    }
}

impl Station for MetadataStation {
    type Input = ChunkRecord;
    type Output = ChunkRecord;

    fn name(&self) -> &'static str {
        "extract-metadata"
    }

    fn process(&mut self, mut record: ChunkRecord) -> Result<Option<ChunkRecord>, StationError> {
        let transcript = self.transcriber.transcribe(record.payload());
        record.annotate(keys::TRANSCRIPT, transcript);
        record.annotate(keys::EXTRACTED_AT, self.clock.rfc3339());
        Ok(Some(record))
    }
}
