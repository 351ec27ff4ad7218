//! Notification error types.

use thiserror::Error;

/// Notification errors.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error while reading or writing settings.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON.
    #[error("settings format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] safeline_proto::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, Error>;
