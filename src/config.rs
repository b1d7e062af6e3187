use crate::defaults;
use crate::error::{ChunkflowError, Result};
use crate::pipeline::PipelineConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineSettings,
    pub storage: StorageConfig,
}

/// HTTP / WebSocket listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub max_body_bytes: usize,
}

/// Queue and worker sizing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub workers: usize,
}

/// Durable append log location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub log_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: defaults::LISTEN_ADDR.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            shutdown_grace_secs: defaults::SHUTDOWN_GRACE_SECS,
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::QUEUE_CAPACITY,
            workers: defaults::WORKERS_PER_STAGE,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(defaults::LOG_PATH),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(ChunkflowError::from)?;
        Ok(config)
    }

    /// Load configuration from a file that must exist.
    ///
    /// A missing file is [`ChunkflowError::ConfigFileNotFound`] rather than a
    /// bare I/O error.
    pub fn load_required(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(ChunkflowError::ConfigFileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        Self::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Load configuration from a file or return defaults if the file doesn't exist.
    ///
    /// Invalid TOML and unreadable files are still errors.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CHUNKFLOW_LISTEN → server.listen
    /// - CHUNKFLOW_LOG_PATH → storage.log_path
    /// - CHUNKFLOW_QUEUE_CAPACITY → pipeline.queue_capacity
    /// - CHUNKFLOW_WORKERS → pipeline.workers
    ///
    /// Empty values are ignored, as are numbers that fail to parse.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(listen) = std::env::var("CHUNKFLOW_LISTEN")
            && !listen.is_empty()
        {
            self.server.listen = listen;
        }

        if let Ok(log_path) = std::env::var("CHUNKFLOW_LOG_PATH")
            && !log_path.is_empty()
        {
            self.storage.log_path = PathBuf::from(log_path);
        }

        if let Some(capacity) = env_usize("CHUNKFLOW_QUEUE_CAPACITY") {
            self.pipeline.queue_capacity = capacity;
        }

        if let Some(workers) = env_usize("CHUNKFLOW_WORKERS") {
            self.pipeline.workers = workers;
        }

        self
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.listen.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "server.listen",
                format!("'{}' is not a socket address", self.server.listen),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be at least 1"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes", "must be at least 1"));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(invalid("pipeline.queue_capacity", "must be at least 1"));
        }
        if self.pipeline.workers == 0 {
            return Err(invalid("pipeline.workers", "must be at least 1"));
        }
        if self.storage.log_path.as_os_str().is_empty() {
            return Err(invalid("storage.log_path", "must not be empty"));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: self.pipeline.queue_capacity,
            workers: self.pipeline.workers,
        }
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/chunkflow/config.toml on Linux, or `None` when the
    /// platform has no config directory.
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chunkflow").join("config.toml"))
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ChunkflowError::Other(e.to_string()))
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            if !value.is_empty() {
                tracing::warn!(key, value = %value, "ignoring non-numeric environment override");
            }
            None
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ChunkflowError {
    ChunkflowError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}
