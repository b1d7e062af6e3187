//! Newline-delimited JSON append log.

use crate::pipeline::types::ChunkRecord;
use crate::storage::{ChunkStore, StoreError};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Write-only durable trail of finished records, one JSON document per line.
///
/// There is no read path: every lookup reports `NotFound`. Writers are
/// serialized by a single mutex around the append.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendLog {
    /// Opens the log for appending, creating it (and its parent directory) if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes and appends a single record.
    pub fn append(&self, record: &ChunkRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

impl ChunkStore for AppendLog {
    fn save(&self, record: Arc<ChunkRecord>) -> Result<(), StoreError> {
        self.append(&record)
    }

    fn get_by_id(&self, id: &str) -> Result<Arc<ChunkRecord>, StoreError> {
        Err(StoreError::NotFound { id: id.to_string() })
    }

    fn get_by_submitter(&self, submitter_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError> {
        Err(StoreError::NotFound {
            id: submitter_id.to_string(),
        })
    }

    fn get_by_session(&self, session_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError> {
        Err(StoreError::NotFound {
            id: session_id.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "append-log"
    }
}
