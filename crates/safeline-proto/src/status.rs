//! Channel connection status.

use serde::{Deserialize, Serialize};

/// Status of an underlying subscription, as reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Subscription requested, not yet confirmed.
    Opening,
    /// Subscription confirmed and delivering events.
    Open,
    /// Subscription failed.
    Error,
    /// Subscription did not confirm in time.
    Timeout,
    /// Subscription closed.
    Closed,
}

impl ChannelStatus {
    /// Whether events are currently flowing.
    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelStatus::Open)
    }

    /// Whether this status reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, ChannelStatus::Error | ChannelStatus::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Opening => "opening",
            ChannelStatus::Open => "open",
            ChannelStatus::Error => "error",
            ChannelStatus::Timeout => "timeout",
            ChannelStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
