//! Default configuration constants for chunkflow.
//!
//! Shared by the config file defaults, the CLI and the pipeline builder so the
//! numbers only live in one place.

/// Capacity of every bounded hand-off queue, including the ingress queue.
///
/// Once this many records wait at the entry point, submissions are rejected
/// with a backpressure error instead of blocking the caller.
pub const QUEUE_CAPACITY: usize = 100;

/// Workers per pooled stage (validate, transform, extract-metadata).
pub const WORKERS_PER_STAGE: usize = 5;

/// Default HTTP listen address.
pub const LISTEN_ADDR: &str = "0.0.0.0:8081";

/// Default append-log location, relative to the working directory.
pub const LOG_PATH: &str = "data.db";

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long in-flight requests may run after a shutdown signal.
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// Largest accepted upload body in bytes (16 MiB).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Submitter id stamped on every record that arrives over the socket stream.
pub const STREAM_SUBMITTER_ID: &str = "ws_user";

/// Session id stamped on every record that arrives over the socket stream.
pub const STREAM_SESSION_ID: &str = "ws_session";

/// Placeholder checksum written by the transform stage.
pub const PLACEHOLDER_CHECKSUM: &str = "deadbeef";

/// Placeholder transcript written by the extract-metadata stage.
pub const PLACEHOLDER_TRANSCRIPT: &str = "Hello World";

/// Metadata keys stamped by the processing stages.
pub mod keys {
    pub const CHECKSUM: &str = "checksum";
    pub const TRANSFORMED_AT: &str = "transformed_at";
    pub const TRANSCRIPT: &str = "fake_transcript";
    pub const EXTRACTED_AT: &str = "extracted_at";
}
