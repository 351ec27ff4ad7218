//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Realtime configuration or transport error.
    #[error("realtime error: {0}")]
    Realtime(#[from] safeline_realtime::Error),

    /// Notification center error.
    #[error("notification error: {0}")]
    Notify(#[from] safeline_notify::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] safeline_proto::Error),
}
