//! Command-line interface for chunkflow
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Backpressured ingestion server for binary media chunks
#[derive(Parser, Debug)]
#[command(
    name = "chunkflow",
    version,
    about = "Backpressured ingestion server for binary media chunks"
)]
pub struct Cli {
    /// Subcommand to execute (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Address to listen on (e.g., 127.0.0.1:8081)
    #[arg(long, global = true, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Append log location
    #[arg(long, global = true, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Capacity of each pipeline queue
    #[arg(long, global = true, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Workers per pooled pipeline stage
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-request timeout. Examples: 10, 30s, 2m
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration_secs)]
    pub request_timeout: Option<u64>,
}

/// Parse a duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_duration_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the ingestion pipeline and HTTP/WebSocket server (default)
    Serve,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment + flags) as TOML
    Show,
    /// Print the configuration file path in use
    Path,
}

impl Cli {
    /// Config file to read: `--config`, else the platform default.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(log_path) = &self.log_path {
            config.storage.log_path = log_path.clone();
        }
        if let Some(capacity) = self.queue_capacity {
            config.pipeline.queue_capacity = capacity;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(timeout) = self.request_timeout {
            config.server.request_timeout_secs = timeout;
        }
        config
    }
}
