//! Concurrent in-memory chunk table with submitter and session indices.

use crate::pipeline::types::ChunkRecord;
use crate::storage::{ChunkStore, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    /// Owning table, keyed by chunk id.
    chunks: HashMap<String, Arc<ChunkRecord>>,
    /// submitter id -> chunk ids. Entries are only ever added.
    by_submitter: HashMap<String, BTreeSet<String>>,
    /// session id -> chunk ids. Entries are only ever added.
    by_session: HashMap<String, BTreeSet<String>>,
}

impl Tables {
    fn resolve(&self, ids: Option<&BTreeSet<String>>) -> Vec<Arc<ChunkRecord>> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.chunks.get(id).cloned())
            .collect()
    }
}

/// In-memory store of finished records.
///
/// Reads share the lock with each other; `save` takes it exclusively. Index
/// entries hold ids only and are always resolved through the primary table.
/// Re-saving an id under a different submitter or session leaves the old
/// index entry in place, so a lookup by the old key still returns the
/// current record.
#[derive(Debug, Default)]
pub struct IndexedStore {
    tables: RwLock<Tables>,
}

impl IndexedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a record and indexes it. Never fails.
    pub fn insert(&self, record: Arc<ChunkRecord>) {
        let id = record.id().to_string();
        let mut tables = self.write();

        tables
            .by_submitter
            .entry(record.submitter_id().to_string())
            .or_default()
            .insert(id.clone());
        tables
            .by_session
            .entry(record.session_id().to_string())
            .or_default()
            .insert(id.clone());
        tables.chunks.insert(id, record);
    }

    pub fn find(&self, id: &str) -> Option<Arc<ChunkRecord>> {
        self.read().chunks.get(id).cloned()
    }

    /// Records indexed under a submitter, ordered by id. Empty if unknown.
    pub fn find_by_submitter(&self, submitter_id: &str) -> Vec<Arc<ChunkRecord>> {
        let tables = self.read();
        tables.resolve(tables.by_submitter.get(submitter_id))
    }

    /// Records indexed under a session, ordered by id. Empty if unknown.
    pub fn find_by_session(&self, session_id: &str) -> Vec<Arc<ChunkRecord>> {
        let tables = self.read();
        tables.resolve(tables.by_session.get(session_id))
    }

    pub fn len(&self) -> usize {
        self.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkStore for IndexedStore {
    fn save(&self, record: Arc<ChunkRecord>) -> Result<(), StoreError> {
        self.insert(record);
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> Result<Arc<ChunkRecord>, StoreError> {
        self.find(id).ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn get_by_submitter(&self, submitter_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError> {
        Ok(self.find_by_submitter(submitter_id))
    }

    fn get_by_session(&self, session_id: &str) -> Result<Vec<Arc<ChunkRecord>>, StoreError> {
        Ok(self.find_by_session(session_id))
    }

    fn name(&self) -> &'static str {
        "indexed-store"
    }
}
