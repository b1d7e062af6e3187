//! Staged chunk ingestion pipeline.
//!
//! Records flow through five stations (ingest, validate, transform,
//! extract-metadata, sink). Each station runs on its own worker threads,
//! connected by bounded crossbeam channels. A full ingress queue is reported
//! to the submitter instead of blocking it.

pub mod cancel;
pub mod clock;
pub mod error;
pub mod gate;
pub mod metadata_station;
pub mod orchestrator;
pub mod sink;
pub mod station;
pub mod stats;
pub mod transform_station;
pub mod types;
pub mod validate_station;

pub use cancel::{CancelSource, CancelToken};
pub use clock::{Clock, SystemClock};
pub use error::{ErrorReporter, LogReporter, StationError, SubmitError};
pub use gate::SubmissionGate;
pub use metadata_station::{MetadataStation, PlaceholderTranscriber, Transcriber};
pub use orchestrator::{Pipeline, PipelineConfig, QueueDepths};
pub use sink::SinkStation;
pub use station::{Station, StationPool, WorkerContext};
pub use stats::{PipelineStats, StatsSnapshot};
pub use transform_station::{ContentHasher, PlaceholderHasher, TransformStation};
pub use types::{ChunkRecord, Phase};
pub use validate_station::{IngestStation, ValidateStation, is_admissible};
