//! Error types for the command line tool

use groupperms_core::{ConfigError, StoreError};

/// Error type for CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings could not be loaded
    #[error("Failed to load settings: {0}")]
    Config(#[from] ConfigError),

    /// The permissions document could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The named group is not defined
    #[error("No such group: {0}")]
    NoSuchGroup(String),

    /// Failed to encode JSON output
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to write output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;
