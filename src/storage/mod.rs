//! Storage collaborators fed by the pipeline sink.
//!
//! The [`IndexedStore`] is the in-memory source of truth for queries. The
//! [`AppendLog`] is a write-only durable trail with no read path.

pub mod append_log;
pub mod indexed;

pub use append_log::AppendLog;
pub use indexed::IndexedStore;

use crate::pipeline::types::ChunkRecord;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chunk not found: {id}")]
    NotFound { id: String },

    #[error("append log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize chunk: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A place finished records are saved to.
///
/// Records are shared as `Arc` so the sink can hand the same finished record
/// to several stores without copying the payload.
pub trait ChunkStore: Send + Sync {
    fn save(&self, record: Arc<ChunkRecord>) -> Result<(), StoreError>;

    fn get_by_id(&self, id: &str) -> Result<Arc<ChunkRecord>, StoreError>;

    fn get_by_submitter(&self, submitter_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError>;

    fn get_by_session(&self, session_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError>;

    /// Name for logging.
    fn name(&self) -> &'static str;
}
