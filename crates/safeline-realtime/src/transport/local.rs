//! In-process loopback transport.
//!
//! Events published on a [`LocalTransport`] go straight to every sink opened
//! for the resource. Status changes are driven explicitly with
//! [`LocalTransport::set_status`], or automatically on open when
//! auto-connect is enabled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use safeline_proto::{ChangeEvent, ChannelStatus};

use super::{ChannelSink, ChannelSpec, Transport, TransportHandle};
use crate::error::Error;

struct OpenSubscription {
    spec: ChannelSpec,
    sink: ChannelSink,
}

/// Loopback transport delivering published events in-process.
pub struct LocalTransport {
    next_handle: AtomicU64,
    subscriptions: Mutex<HashMap<TransportHandle, OpenSubscription>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    auto_connect: bool,
    fail_opens: AtomicBool,
}

impl LocalTransport {
    /// Create a transport that leaves channels in `Opening` until told otherwise.
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            subscriptions: Mutex::new(HashMap::new()),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            auto_connect: false,
            fail_opens: AtomicBool::new(false),
        }
    }

    /// Report `Opening` then `Open` for every subscription as it is opened.
    pub fn with_auto_connect(mut self) -> Self {
        self.auto_connect = true;
        self
    }

    /// Make subsequent opens fail (or succeed again).
    pub fn set_fail_opens(&self, fail: bool) {
        self.fail_opens.store(fail, Ordering::SeqCst);
    }

    /// Deliver an event to every subscription on `resource`.
    ///
    /// Returns the number of subscriptions the event was delivered to.
    pub fn publish(&self, resource: &str, event: &ChangeEvent) -> usize {
        let sinks = self.sinks_for(resource);
        for sink in &sinks {
            sink.deliver(event);
        }
        trace!(resource, change_type = %event.change_type, delivered = sinks.len(), "published");
        sinks.len()
    }

    /// Report a status transition on every subscription for `resource`.
    pub fn set_status(&self, resource: &str, status: ChannelStatus) -> usize {
        let sinks = self.sinks_for(resource);
        for sink in &sinks {
            sink.report_status(status);
        }
        sinks.len()
    }

    /// Total subscriptions opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Total subscriptions closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Subscriptions currently open for `resource`.
    pub fn active_count(&self, resource: &str) -> usize {
        self.subscriptions
            .lock()
            .values()
            .filter(|sub| sub.spec.resource == resource)
            .count()
    }

    /// Topics of all open subscriptions.
    pub fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .subscriptions
            .lock()
            .values()
            .map(|sub| sub.spec.topic.clone())
            .collect();
        topics.sort();
        topics
    }

    // Sinks are cloned out so no lock is held while they call into the registry.
    fn sinks_for(&self, resource: &str) -> Vec<ChannelSink> {
        self.subscriptions
            .lock()
            .values()
            .filter(|sub| sub.spec.resource == resource)
            .map(|sub| sub.sink.clone())
            .collect()
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn open(&self, spec: &ChannelSpec, sink: ChannelSink) -> Result<TransportHandle, Error> {
        if self.fail_opens.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!("open refused for {}", spec.topic)));
        }

        let handle = TransportHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().insert(
            handle,
            OpenSubscription {
                spec: spec.clone(),
                sink: sink.clone(),
            },
        );
        debug!(%handle, topic = %spec.topic, "local subscription opened");

        if self.auto_connect {
            sink.report_status(ChannelStatus::Opening);
            sink.report_status(ChannelStatus::Open);
        }

        Ok(handle)
    }

    fn close(&self, handle: TransportHandle) {
        let removed = self.subscriptions.lock().remove(&handle);
        if let Some(sub) = removed {
            self.closes.fetch_add(1, Ordering::SeqCst);
            debug!(%handle, topic = %sub.spec.topic, "local subscription closed");
            sub.sink.report_status(ChannelStatus::Closed);
        }
    }
}
