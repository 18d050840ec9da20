//! Error types for CLI operations.

use buffered::BufferError;
use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Buffer refused to start or to accept an item
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Some callers received a result that was not theirs
    #[error("{count} responses were delivered to the wrong caller")]
    IdentityMismatch { count: u64 },

    /// A submitter task died
    #[error("Submitter task failed: {0}")]
    Submitter(#[from] tokio::task::JoinError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
