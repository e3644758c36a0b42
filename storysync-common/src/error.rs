//! Common error types for storysync

use thiserror::Error;

/// Common result type for storysync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the storysync crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeline manifest could not be parsed
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Timestamp string could not be parsed
    #[error("Invalid time '{0}'")]
    InvalidTime(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
