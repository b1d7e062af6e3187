//! Error types for chunkflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkflowError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Pipeline lifecycle errors
    #[error("Pipeline is not stopped (currently {phase})")]
    PipelineNotStopped { phase: String },

    #[error("Failed to spawn worker for stage {stage}: {message}")]
    WorkerSpawn { stage: String, message: String },

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ChunkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_not_found_display() {
        let error = ChunkflowError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = ChunkflowError::ConfigInvalidValue {
            key: "pipeline.workers".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for pipeline.workers: must be at least 1"
        );
    }

    #[test]
    fn test_pipeline_not_stopped_display() {
        let error = ChunkflowError::PipelineNotStopped {
            phase: "running".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Pipeline is not stopped (currently running)"
        );
    }

    #[test]
    fn test_worker_spawn_display() {
        let error = ChunkflowError::WorkerSpawn {
            stage: "validate".to_string(),
            message: "resource temporarily unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to spawn worker for stage validate: resource temporarily unavailable"
        );
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: ChunkflowError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain_toml() {
        let toml_error = toml::from_str::<toml::Value>("key =").unwrap_err();
        let error: ChunkflowError = toml_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ChunkflowError>();
        assert_sync::<ChunkflowError>();
    }
}
