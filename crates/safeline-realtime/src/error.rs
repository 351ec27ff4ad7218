//! Realtime error types.

use thiserror::Error;

/// Realtime errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport refused or failed to open a subscription.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] safeline_proto::Error),
}
