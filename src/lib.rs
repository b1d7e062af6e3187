//! chunkflow - Backpressured ingestion of binary media chunks
//!
//! Chunks arrive over HTTP or a WebSocket stream, pass through a fixed
//! sequence of worker stages, and land in an in-memory indexed store and an
//! append-only log.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod storage;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, QueueDepths};
pub use pipeline::{ChunkRecord, Phase, SubmissionGate, SubmitError};

// Storage
pub use storage::{AppendLog, ChunkStore, IndexedStore, StoreError};

// Error handling
pub use error::{ChunkflowError, Result};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
