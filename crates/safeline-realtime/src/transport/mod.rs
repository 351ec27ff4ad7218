//! Transport abstraction for realtime subscriptions.
//!
//! The registry never talks to the network itself. A [`Transport`] opens one
//! subscription per [`ChannelSpec`] and reports back through the
//! [`ChannelSink`] it was handed: change events via
//! [`ChannelSink::deliver`], status transitions via
//! [`ChannelSink::report_status`]. Reconnects and backoff, if any, are the
//! transport's business.

mod local;

use std::fmt;

pub use local::LocalTransport;

use crate::config::RealtimeConfig;
use crate::error::Error;
pub use crate::registry::ChannelSink;

/// What the transport should subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Resource key (e.g., a table name).
    pub resource: String,
    /// Schema the resource lives in.
    pub schema: String,
    /// Fully qualified topic name.
    pub topic: String,
}

impl ChannelSpec {
    /// Build the spec for a resource under the given configuration.
    pub fn new(resource: impl Into<String>, config: &RealtimeConfig) -> Self {
        let resource = resource.into();
        Self {
            topic: config.topic_for(&resource),
            schema: config.schema.clone(),
            resource,
        }
    }
}

/// Opaque handle to an open transport subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(u64);

impl TransportHandle {
    /// Wrap a transport-assigned subscription id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Transport-assigned subscription id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport-{}", self.0)
    }
}

/// Realtime transport capability.
///
/// `open` must not block on the connection being confirmed; confirmation
/// arrives later through `sink.report_status`. Implementations may call the
/// sink from inside `open`.
pub trait Transport: Send + Sync {
    /// Open a subscription for `spec`, delivering into `sink`.
    fn open(&self, spec: &ChannelSpec, sink: ChannelSink) -> Result<TransportHandle, Error>;

    /// Close a subscription. Closing an unknown or already closed handle is a no-op.
    fn close(&self, handle: TransportHandle);
}
