//! Shared channel state tracked by the registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use safeline_proto::ChannelStatus;

use crate::callbacks::CallbackCell;
use crate::transport::{ChannelSpec, TransportHandle};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one logical subscriber.
///
/// Ids come from a process-wide counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a new, unique subscriber id.
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One live subscription for a resource and the subscribers sharing it.
///
/// Exists in the registry while it has at least one subscriber, or while
/// its transport open is still in flight.
pub(crate) struct SharedChannel {
    /// Incarnation number; a sink only acts on the channel it was opened for.
    pub(crate) generation: u64,
    pub(crate) spec: ChannelSpec,
    /// Transport subscription. None until open returns, or if open failed.
    pub(crate) handle: Option<TransportHandle>,
    /// Set while the transport's `open` call is in flight.
    pub(crate) open_pending: bool,
    pub(crate) status: ChannelStatus,
    /// Subscribers in registration order.
    subscribers: Vec<(SubscriberId, CallbackCell)>,
    created_at: Instant,
    events_dispatched: u64,
}

impl SharedChannel {
    pub(crate) fn new(
        generation: u64,
        spec: ChannelSpec,
        subscriber_id: SubscriberId,
        callbacks: CallbackCell,
    ) -> Self {
        Self {
            generation,
            spec,
            handle: None,
            open_pending: true,
            status: ChannelStatus::Opening,
            subscribers: vec![(subscriber_id, callbacks)],
            created_at: Instant::now(),
            events_dispatched: 0,
        }
    }

    /// Register a subscriber, replacing its cell if already present.
    ///
    /// Returns true if the subscriber was newly added.
    pub(crate) fn insert_subscriber(&mut self, id: SubscriberId, callbacks: CallbackCell) -> bool {
        match self.subscribers.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => {
                entry.1 = callbacks;
                false
            }
            None => {
                self.subscribers.push((id, callbacks));
                true
            }
        }
    }

    pub(crate) fn remove_subscriber(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub(crate) fn callbacks_for(&self, id: SubscriberId) -> Option<CallbackCell> {
        self.subscribers
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, cell)| cell.clone())
    }

    pub(crate) fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// No subscribers and no open in flight; safe to tear down.
    pub(crate) fn is_idle(&self) -> bool {
        self.is_empty() && !self.open_pending
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Record a status transition, returning the previous status.
    pub(crate) fn set_status(&mut self, status: ChannelStatus) -> ChannelStatus {
        std::mem::replace(&mut self.status, status)
    }

    pub(crate) fn record_dispatch(&mut self) {
        self.events_dispatched += 1;
    }

    pub(crate) fn info(&self, resource: &str) -> ChannelInfo {
        ChannelInfo {
            resource: resource.to_string(),
            topic: self.spec.topic.clone(),
            status: self.status,
            subscriber_count: self.subscribers.len(),
            events_dispatched: self.events_dispatched,
            age: self.created_at.elapsed(),
        }
    }
}

/// Point-in-time view of a channel, for diagnostics.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub resource: String,
    pub topic: String,
    pub status: ChannelStatus,
    pub subscriber_count: usize,
    /// Events fanned out since the channel was created.
    pub events_dispatched: u64,
    pub age: Duration,
}
