//! Per-call-site subscriber handles.

use std::cell::Cell;
use std::fmt;

use parking_lot::ReentrantMutex;

use crate::callbacks::{CallbackCell, Callbacks};
use crate::channel::SubscriberId;
use crate::observer::StatusObserver;
use crate::registry::ChannelRegistry;

/// One call site's interest in a resource.
///
/// The handle owns a unique [`SubscriberId`] and a callback cell. The
/// registry dispatches through the cell, so [`set_callbacks`] takes effect
/// on the next event without re-subscribing. `subscribe` and `unsubscribe`
/// are idempotent, and dropping the handle unsubscribes.
///
/// [`set_callbacks`]: SubscriberHandle::set_callbacks
pub struct SubscriberHandle {
    registry: ChannelRegistry,
    resource: String,
    id: SubscriberId,
    callbacks: CallbackCell,
    /// Serializes subscribe/unsubscribe. Reentrant so callbacks fired while
    /// attaching may unsubscribe this handle.
    subscribed: ReentrantMutex<Cell<bool>>,
}

impl SubscriberHandle {
    pub(crate) fn new(registry: ChannelRegistry, resource: String, callbacks: Callbacks) -> Self {
        Self {
            registry,
            resource,
            id: SubscriberId::next(),
            callbacks: callbacks.into_cell(),
            subscribed: ReentrantMutex::new(Cell::new(false)),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.lock().get()
    }

    /// Register with the registry. Returns whether the channel is connected.
    ///
    /// Calling this again while subscribed re-attaches the same callback
    /// cell and never opens a second channel.
    pub fn subscribe(&self) -> bool {
        let subscribed = self.subscribed.lock();
        subscribed.set(true);
        self.registry
            .attach(&self.resource, self.id, self.callbacks.clone())
    }

    /// Deregister from the registry. No-op if not subscribed.
    pub fn unsubscribe(&self) {
        let subscribed = self.subscribed.lock();
        if subscribed.replace(false) {
            self.registry.unsubscribe(&self.resource, self.id);
        }
    }

    /// Replace the callbacks used for subsequent events.
    pub fn set_callbacks(&self, callbacks: Callbacks) {
        *self.callbacks.write() = callbacks;
    }

    pub fn is_connected(&self) -> bool {
        self.registry.is_connected(&self.resource)
    }

    /// Observer for this handle's resource.
    pub fn observer(&self) -> StatusObserver {
        self.registry.observer(self.resource.clone())
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("resource", &self.resource)
            .field("id", &self.id)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeConfig;
    use crate::transport::LocalTransport;
    use safeline_proto::{ChangeEvent, ChannelStatus};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn setup() -> (Arc<LocalTransport>, ChannelRegistry) {
        let transport = Arc::new(LocalTransport::new());
        let registry = ChannelRegistry::new(transport.clone(), RealtimeConfig::default()).unwrap();
        (transport, registry)
    }

    #[test]
    fn test_handles_get_distinct_ids() {
        let (_transport, registry) = setup();
        let a = registry.handle("profiles", Callbacks::new());
        let b = registry.handle("profiles", Callbacks::new());
        assert_ne!(a.id(), b.id());
        assert!(!a.is_subscribed());
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let (transport, registry) = setup();
        let handle = registry.handle("profiles", Callbacks::new());

        assert!(!handle.subscribe());
        transport.set_status("profiles", ChannelStatus::Open);
        assert!(handle.subscribe());

        assert_eq!(transport.open_count(), 1);
        assert_eq!(registry.subscriber_count("profiles"), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (transport, registry) = setup();
        let a = registry.subscribe("profiles", Callbacks::new());
        let b = registry.subscribe("profiles", Callbacks::new());

        a.unsubscribe();
        a.unsubscribe();

        assert!(!a.is_subscribed());
        assert!(b.is_subscribed());
        assert_eq!(registry.subscriber_count("profiles"), 1);
        assert_eq!(transport.close_count(), 0);
    }

    #[test]
    fn test_resubscribe_after_unsubscribe() {
        let (transport, registry) = setup();
        let handle = registry.subscribe("profiles", Callbacks::new());
        handle.unsubscribe();
        handle.subscribe();

        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.close_count(), 1);
        assert_eq!(registry.subscriber_count("profiles"), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (transport, registry) = setup();
        {
            let _handle = registry.subscribe("profiles", Callbacks::new());
            assert_eq!(registry.subscriber_count("profiles"), 1);
        }
        assert_eq!(registry.subscriber_count("profiles"), 0);
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn test_set_callbacks_swaps_without_resubscribing() {
        let (transport, registry) = setup();
        let old_hits = Arc::new(AtomicUsize::new(0));
        let new_hits = Arc::new(AtomicUsize::new(0));

        let handle = registry.subscribe(
            "profiles",
            Callbacks::new().on_insert({
                let old_hits = old_hits.clone();
                move |_| {
                    old_hits.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        handle.set_callbacks(Callbacks::new().on_insert({
            let new_hits = new_hits.clone();
            move |_| {
                new_hits.fetch_add(1, Ordering::SeqCst);
            }
        }));

        transport.publish("profiles", &ChangeEvent::insert("profiles", json!({"id": 1})));

        assert_eq!(old_hits.load(Ordering::SeqCst), 0);
        assert_eq!(new_hits.load(Ordering::SeqCst), 1);
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_racing_subscribe_and_unsubscribe_stay_consistent() {
        let (transport, registry) = setup();
        let handle = Arc::new(registry.handle("profiles", Callbacks::new()));

        let workers: Vec<_> = (0..4)
            .map(|n| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        if (i + n) % 2 == 0 {
                            handle.subscribe();
                        } else {
                            handle.unsubscribe();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let expected = usize::from(handle.is_subscribed());
        assert_eq!(registry.subscriber_count("profiles"), expected);
        assert_eq!(transport.active_count("profiles"), expected);

        drop(handle);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(transport.active_count("profiles"), 0);
    }
}
