//! Data types flowing through the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A unit of ingested media together with the annotations the stages add.
///
/// A record is moved by value through the hand-off queues, so exactly one
/// stage owns it at a time. Once the identifier is set it never changes, and
/// metadata only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    id: String,
    submitter_id: String,
    session_id: String,
    ingest_timestamp: i64,
    #[serde(with = "payload_base64")]
    payload: Vec<u8>,
    metadata: Option<BTreeMap<String, String>>,
}

impl ChunkRecord {
    /// Creates a record without an identifier.
    ///
    /// The validate stage assigns one if the record gets that far without it.
    pub fn new(
        submitter_id: impl Into<String>,
        session_id: impl Into<String>,
        ingest_timestamp: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: String::new(),
            submitter_id: submitter_id.into(),
            session_id: session_id.into(),
            ingest_timestamp,
            payload: payload.into(),
            metadata: None,
        }
    }

    /// Sets a caller-chosen identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets a freshly generated identifier.
    pub fn with_generated_id(self) -> Self {
        self.with_id(generate_id())
    }

    /// Assigns a generated identifier if none is set, and returns the identifier.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_empty() {
            self.id = generate_id();
        }
        &self.id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn submitter_id(&self) -> &str {
        &self.submitter_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn ingest_timestamp(&self) -> i64 {
        self.ingest_timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the metadata map, or `None` if no stage has annotated the record yet.
    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()
    }

    /// Looks up a single metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Adds a metadata entry, creating the map on first use.
    ///
    /// Existing keys are left untouched. Returns `true` if the entry was added.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let metadata = self.metadata.get_or_insert_with(BTreeMap::new);
        let key = key.into();
        if metadata.contains_key(&key) {
            return false;
        }
        metadata.insert(key, value.into());
        true
    }
}

/// Generates a random, effectively unique chunk identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lifecycle phase of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Stopped => write!(f, "stopped"),
            Phase::Running => write!(f, "running"),
            Phase::Stopping => write!(f, "stopping"),
        }
    }
}

/// Serializes payload bytes as a standard base64 string.
mod payload_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_id_and_no_metadata() {
        let record = ChunkRecord::new("u1", "s1", 1_690_000_000, b"hello".to_vec());

        assert!(!record.has_id());
        assert_eq!(record.id(), "");
        assert_eq!(record.submitter_id(), "u1");
        assert_eq!(record.session_id(), "s1");
        assert_eq!(record.ingest_timestamp(), 1_690_000_000);
        assert_eq!(record.payload(), b"hello");
        assert!(record.metadata().is_none());
    }

    #[test]
    fn test_ensure_id_assigns_once() {
        let mut record = ChunkRecord::new("u1", "s1", 0, b"x".to_vec());
        let first = record.ensure_id().to_string();
        assert!(!first.is_empty());

        let second = record.ensure_id().to_string();
        assert_eq!(first, second, "identifier must not change once assigned");
    }

    #[test]
    fn test_ensure_id_keeps_caller_id() {
        let mut record = ChunkRecord::new("u1", "s1", 0, b"x".to_vec()).with_id("caller-7");
        assert_eq!(record.ensure_id(), "caller-7");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ChunkRecord::new("u", "s", 0, b"x".to_vec()).with_generated_id();
        let b = ChunkRecord::new("u", "s", 0, b"x".to_vec()).with_generated_id();
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_annotate_creates_map_lazily() {
        let mut record = ChunkRecord::new("u1", "s1", 0, b"x".to_vec());
        assert!(record.annotate("checksum", "deadbeef"));
        assert_eq!(record.metadata_value("checksum"), Some("deadbeef"));
    }

    #[test]
    fn test_annotate_never_overwrites() {
        let mut record = ChunkRecord::new("u1", "s1", 0, b"x".to_vec());
        assert!(record.annotate("checksum", "first"));
        assert!(!record.annotate("checksum", "second"));
        assert_eq!(record.metadata_value("checksum"), Some("first"));
        assert_eq!(record.metadata().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_json_shape() {
        let mut record = ChunkRecord::new("u1", "s1", 42, b"hello".to_vec()).with_id("id-1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "id-1");
        assert_eq!(json["submitter_id"], "u1");
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["ingest_timestamp"], 42);
        assert_eq!(json["payload"], "aGVsbG8=");
        assert!(json["metadata"].is_null());

        record.annotate("checksum", "deadbeef");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metadata"]["checksum"], "deadbeef");
    }

    #[test]
    fn test_json_payload_decodes() {
        let json = r#"{"id":"a","submitter_id":"u","session_id":"s","ingest_timestamp":1,"payload":"aGVsbG8=","metadata":null}"#;
        let record: ChunkRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.payload(), b"hello");
    }

    #[test]
    fn test_json_rejects_bad_base64() {
        let json = r#"{"id":"a","submitter_id":"u","session_id":"s","ingest_timestamp":1,"payload":"!!!","metadata":null}"#;
        assert!(serde_json::from_str::<ChunkRecord>(json).is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Stopped.to_string(), "stopped");
        assert_eq!(Phase::Running.to_string(), "running");
        assert_eq!(Phase::Stopping.to_string(), "stopping");
    }
}
