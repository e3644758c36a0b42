//! Error types for storysync-player
//!
//! Only setup operations return errors (configuration, manifest loading,
//! lifecycle misuse). Playback-surface failures never propagate: the window
//! controller retries them on a later tick.

use thiserror::Error;

/// Main error type for the player crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library (manifest, time parsing, I/O)
    #[error(transparent)]
    Common(#[from] storysync_common::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
