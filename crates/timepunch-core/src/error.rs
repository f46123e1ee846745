//! Error types for the Timepunch core library.

use thiserror::Error;

/// Result type alias using the Timepunch core Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Timepunch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Offline queue read/write failure. A punch accepted from the caller
    /// has no other copy, so these must never be swallowed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
