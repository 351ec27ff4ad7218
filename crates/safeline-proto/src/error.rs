//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource key failed validation.
    #[error("invalid resource key {key:?}: {reason}")]
    InvalidResourceKey { key: String, reason: &'static str },

    /// Event payload could not be decoded.
    #[error("payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Event carried no record where one was required.
    #[error("event has no {0} record")]
    MissingRecord(&'static str),
}
