//! Channel registry: one shared transport subscription per resource.
//!
//! The registry maps a resource key to a single `SharedChannel` holding the
//! transport subscription and every subscriber interested in that resource.
//! The first subscriber for a key creates the channel, the last one to leave
//! tears it down.
//!
//! ## Locking
//!
//! Check-and-create for a key happens under the map's entry lock, so two
//! callers racing on a fresh key always end up on the same channel. No lock
//! is held while calling into the transport or invoking subscriber
//! callbacks; both may re-enter the registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, trace, warn};

use safeline_proto::{ChangeEvent, ChannelStatus};

use crate::callbacks::{CallbackCell, Callbacks};
use crate::channel::{ChannelInfo, SharedChannel, SubscriberId};
use crate::config::RealtimeConfig;
use crate::error::Error;
use crate::handle::SubscriberHandle;
use crate::observer::StatusObserver;
use crate::transport::{ChannelSpec, Transport};

pub(crate) struct RegistryInner {
    channels: DashMap<String, SharedChannel>,
    transport: Arc<dyn Transport>,
    config: RealtimeConfig,
    next_generation: AtomicU64,
}

impl RegistryInner {
    /// Run `f` on the channel for `resource`, if it is the given incarnation.
    fn with_channel<R>(
        &self,
        resource: &str,
        generation: u64,
        f: impl FnOnce(&mut SharedChannel) -> R,
    ) -> Option<R> {
        let mut channel = self.channels.get_mut(resource)?;
        if channel.generation != generation {
            return None;
        }
        Some(f(channel.value_mut()))
    }

    fn teardown(&self, resource: &str, mut channel: SharedChannel) {
        if let Some(handle) = channel.handle.take() {
            self.transport.close(handle);
        }
        info!(
            resource,
            generation = channel.generation,
            topic = %channel.spec.topic,
            "channel torn down"
        );
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        for mut entry in self.channels.iter_mut() {
            if let Some(handle) = entry.value_mut().handle.take() {
                self.transport.close(handle);
            }
        }
    }
}

/// Registry of shared realtime channels.
///
/// Cloning is cheap and yields a handle to the same registry. Build one per
/// process and pass it to consumers; tests build a fresh one each.
#[derive(Clone)]
pub struct ChannelRegistry {
    inner: Arc<RegistryInner>,
}

impl ChannelRegistry {
    /// Create a registry over the given transport.
    ///
    /// Fails if `config` does not validate.
    pub fn new(transport: Arc<dyn Transport>, config: RealtimeConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RegistryInner {
                channels: DashMap::new(),
                transport,
                config,
                next_generation: AtomicU64::new(1),
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    /// Registry configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Subscribe to `resource` and return a handle owning the subscription.
    ///
    /// Dropping the handle unsubscribes.
    pub fn subscribe(&self, resource: impl Into<String>, callbacks: Callbacks) -> SubscriberHandle {
        let handle = self.handle(resource, callbacks);
        handle.subscribe();
        handle
    }

    /// Create a handle for `resource` without subscribing yet.
    pub fn handle(&self, resource: impl Into<String>, callbacks: Callbacks) -> SubscriberHandle {
        SubscriberHandle::new(self.clone(), resource.into(), callbacks)
    }

    /// Register `callbacks` under `subscriber_id` for `resource`.
    ///
    /// Returns whether the channel is currently connected. A newly created
    /// channel always reports false; confirmation arrives asynchronously.
    pub fn subscribe_with_id(
        &self,
        resource: &str,
        subscriber_id: SubscriberId,
        callbacks: Callbacks,
    ) -> bool {
        self.attach(resource, subscriber_id, callbacks.into_cell())
    }

    pub(crate) fn attach(&self, resource: &str, subscriber_id: SubscriberId, cell: CallbackCell) -> bool {
        let (generation, spec) = match self.inner.channels.entry(resource.to_string()) {
            Entry::Occupied(mut entry) => {
                let channel = entry.get_mut();
                let added = channel.insert_subscriber(subscriber_id, cell);
                debug!(
                    resource,
                    %subscriber_id,
                    added,
                    subscribers = channel.subscriber_count(),
                    "subscriber attached to existing channel"
                );
                return channel.is_connected();
            }
            Entry::Vacant(entry) => {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                let spec = ChannelSpec::new(resource, &self.inner.config);
                entry.insert(SharedChannel::new(generation, spec.clone(), subscriber_id, cell));
                (generation, spec)
            }
        };

        info!(resource, %subscriber_id, generation, topic = %spec.topic, "opening channel");

        let sink = ChannelSink {
            registry: self.downgrade(),
            resource: resource.to_string(),
            generation,
        };

        let opened = self.inner.transport.open(&spec, sink);
        if let Err(error) = &opened {
            warn!(resource, topic = %spec.topic, %error, "failed to open channel");
        }
        let handle = opened.ok();

        let stored = self.inner.with_channel(resource, generation, |channel| {
            channel.open_pending = false;
            match handle {
                Some(handle) => channel.handle = Some(handle),
                None => {
                    channel.set_status(ChannelStatus::Error);
                }
            }
        });

        match (stored, handle) {
            // Tear down if everyone left while the transport was opening.
            (Some(()), _) => self.release_if_idle(resource),
            // Channel was closed out from under the open.
            (None, Some(handle)) => {
                debug!(resource, %handle, "channel gone before open returned");
                self.inner.transport.close(handle);
            }
            (None, None) => {}
        }

        false
    }

    fn release_if_idle(&self, resource: &str) {
        if let Some((_, channel)) = self
            .inner
            .channels
            .remove_if(resource, |_, channel| channel.is_idle())
        {
            self.inner.teardown(resource, channel);
        }
    }

    /// Remove `subscriber_id` from `resource`, tearing the channel down if it
    /// was the last subscriber.
    ///
    /// If the transport is still opening the channel, teardown waits for
    /// `open` to return; a subscriber arriving meanwhile reuses the channel.
    ///
    /// Unknown resources and subscribers are ignored.
    pub fn unsubscribe(&self, resource: &str, subscriber_id: SubscriberId) {
        let removed = match self.inner.channels.get_mut(resource) {
            Some(mut channel) => channel.remove_subscriber(subscriber_id),
            None => return,
        };

        if removed {
            debug!(resource, %subscriber_id, "subscriber detached");
        }

        self.release_if_idle(resource);
    }

    /// Whether `resource` has a channel and it is connected.
    pub fn is_connected(&self, resource: &str) -> bool {
        self.inner
            .channels
            .get(resource)
            .map(|channel| channel.is_connected())
            .unwrap_or(false)
    }

    /// Number of subscribers on `resource`, 0 if there is no channel.
    pub fn subscriber_count(&self, resource: &str) -> usize {
        self.inner
            .channels
            .get(resource)
            .map(|channel| channel.subscriber_count())
            .unwrap_or(0)
    }

    /// Last reported status of the channel for `resource`.
    pub fn status(&self, resource: &str) -> Option<ChannelStatus> {
        self.inner.channels.get(resource).map(|channel| channel.status)
    }

    /// Diagnostic snapshot of the channel for `resource`.
    pub fn channel_info(&self, resource: &str) -> Option<ChannelInfo> {
        self.inner
            .channels
            .get(resource)
            .map(|channel| channel.info(resource))
    }

    /// Resources that currently have a channel, sorted.
    pub fn resources(&self) -> Vec<String> {
        let mut resources: Vec<String> = self
            .inner
            .channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        resources.sort();
        resources
    }

    /// Number of live channels.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Observer for the connection status of `resource`.
    pub fn observer(&self, resource: impl Into<String>) -> StatusObserver {
        StatusObserver::new(self.clone(), resource.into())
    }

    /// Tear down every channel, dropping all subscribers.
    ///
    /// Returns the number of channels closed.
    pub fn close_all(&self) -> usize {
        let resources = self.resources();
        let mut closed = 0;
        for resource in resources {
            if let Some((resource, channel)) = self.inner.channels.remove(&resource) {
                self.inner.teardown(&resource, channel);
                closed += 1;
            }
        }
        closed
    }
}

/// Capability handed to a transport for one channel incarnation.
///
/// Every call looks the channel up by resource key and acts only if it is
/// still the incarnation this sink was created for. Calls after the channel
/// is torn down, or after the registry is dropped, are ignored.
#[derive(Clone)]
pub struct ChannelSink {
    registry: Weak<RegistryInner>,
    resource: String,
    generation: u64,
}

impl ChannelSink {
    /// Resource key of the channel this sink feeds.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether the channel this sink feeds still exists.
    pub fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .and_then(|inner| inner.with_channel(&self.resource, self.generation, |_| ()))
            .is_some()
    }

    /// Fan an event out to every current subscriber, in registration order.
    ///
    /// A subscriber removed mid-dispatch gets nothing further. Returns the
    /// number of handlers invoked.
    pub fn deliver(&self, event: &ChangeEvent) -> usize {
        let Some(inner) = self.registry.upgrade() else {
            return 0;
        };

        let Some(subscriber_ids) = inner.with_channel(&self.resource, self.generation, |channel| {
            channel.record_dispatch();
            channel.subscriber_ids()
        }) else {
            trace!(resource = %self.resource, generation = self.generation, "event for stale channel dropped");
            return 0;
        };

        let mut invoked = 0;
        for subscriber_id in subscriber_ids {
            let cell = inner
                .with_channel(&self.resource, self.generation, |channel| {
                    channel.callbacks_for(subscriber_id)
                })
                .flatten();
            let Some(cell) = cell else {
                continue;
            };
            let callbacks = cell.read().clone();
            invoked += callbacks.dispatch(event);
        }

        trace!(
            resource = %self.resource,
            change_type = %event.change_type,
            invoked,
            "event dispatched"
        );
        invoked
    }

    /// Record a status transition reported by the transport.
    pub fn report_status(&self, status: ChannelStatus) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };

        let previous = inner.with_channel(&self.resource, self.generation, |channel| {
            channel.set_status(status)
        });

        match previous {
            Some(previous) if previous == status => {}
            Some(previous) if status.is_failure() => {
                warn!(resource = %self.resource, %previous, %status, "channel status changed");
            }
            Some(previous) => {
                debug!(resource = %self.resource, %previous, %status, "channel status changed");
            }
            None => {
                trace!(resource = %self.resource, %status, "status for stale channel ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn setup() -> (Arc<LocalTransport>, ChannelRegistry) {
        let transport = Arc::new(LocalTransport::new());
        let registry = ChannelRegistry::new(transport.clone(), RealtimeConfig::default()).unwrap();
        (transport, registry)
    }

    fn counter() -> (Arc<AtomicUsize>, Callbacks) {
        let count = Arc::new(AtomicUsize::new(0));
        let callbacks = Callbacks::new().on_change({
            let count = count.clone();
            move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, callbacks)
    }

    #[test]
    fn test_first_subscribe_opens_channel() {
        let (transport, registry) = setup();

        let connected = registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());

        assert!(!connected);
        assert_eq!(transport.open_count(), 1);
        assert_eq!(registry.subscriber_count("profiles"), 1);
        assert_eq!(registry.status("profiles"), Some(ChannelStatus::Opening));
    }

    #[test]
    fn test_second_subscribe_reuses_channel() {
        let (transport, registry) = setup();

        registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());
        transport.set_status("profiles", ChannelStatus::Open);
        let connected = registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());

        assert!(connected);
        assert_eq!(transport.open_count(), 1);
        assert_eq!(registry.subscriber_count("profiles"), 2);
    }

    #[test]
    fn test_resubscribing_same_id_does_not_duplicate() {
        let (transport, registry) = setup();
        let id = SubscriberId::next();

        registry.subscribe_with_id("profiles", id, Callbacks::new());
        registry.subscribe_with_id("profiles", id, Callbacks::new());

        assert_eq!(registry.subscriber_count("profiles"), 1);
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_last_unsubscribe_tears_down() {
        let (transport, registry) = setup();
        let a = SubscriberId::next();
        let b = SubscriberId::next();

        registry.subscribe_with_id("guardians", a, Callbacks::new());
        registry.subscribe_with_id("guardians", b, Callbacks::new());
        transport.set_status("guardians", ChannelStatus::Open);

        registry.unsubscribe("guardians", a);
        assert_eq!(transport.close_count(), 0);
        assert!(registry.is_connected("guardians"));

        registry.unsubscribe("guardians", b);
        assert_eq!(transport.close_count(), 1);
        assert_eq!(registry.channel_count(), 0);
        assert!(!registry.is_connected("guardians"));
        assert_eq!(registry.subscriber_count("guardians"), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let (transport, registry) = setup();
        registry.unsubscribe("nothing", SubscriberId::next());

        let id = SubscriberId::next();
        registry.subscribe_with_id("profiles", id, Callbacks::new());
        registry.unsubscribe("profiles", SubscriberId::next());

        assert_eq!(registry.subscriber_count("profiles"), 1);
        assert_eq!(transport.close_count(), 0);
    }

    #[test]
    fn test_failure_status_keeps_subscribers() {
        let (transport, registry) = setup();
        let (count, callbacks) = counter();

        registry.subscribe_with_id("sos_alerts", SubscriberId::next(), callbacks);
        transport.set_status("sos_alerts", ChannelStatus::Open);
        transport.set_status("sos_alerts", ChannelStatus::Error);

        assert!(!registry.is_connected("sos_alerts"));
        assert_eq!(registry.subscriber_count("sos_alerts"), 1);

        transport.set_status("sos_alerts", ChannelStatus::Timeout);
        transport.publish("sos_alerts", &ChangeEvent::insert("sos_alerts", json!({"id": 1})));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        transport.set_status("sos_alerts", ChannelStatus::Open);
        assert!(registry.is_connected("sos_alerts"));
    }

    #[test]
    fn test_open_failure_is_swallowed() {
        let (transport, registry) = setup();
        transport.set_fail_opens(true);

        let id = SubscriberId::next();
        let connected = registry.subscribe_with_id("diary", id, Callbacks::new());

        assert!(!connected);
        assert_eq!(registry.status("diary"), Some(ChannelStatus::Error));
        assert_eq!(registry.subscriber_count("diary"), 1);

        registry.unsubscribe("diary", id);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(transport.close_count(), 0);
    }

    #[test]
    fn test_stale_sink_does_not_touch_new_channel() {
        let (transport, registry) = setup();
        let first = SubscriberId::next();
        registry.subscribe_with_id("profiles", first, Callbacks::new());
        let stale = ChannelSink {
            registry: registry.downgrade(),
            resource: "profiles".into(),
            generation: registry.inner.channels.get("profiles").unwrap().generation,
        };

        registry.unsubscribe("profiles", first);
        registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());
        transport.set_status("profiles", ChannelStatus::Open);

        stale.report_status(ChannelStatus::Closed);
        assert!(!stale.is_live());
        assert!(registry.is_connected("profiles"));
        assert_eq!(stale.deliver(&ChangeEvent::insert("profiles", json!({}))), 0);
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let (transport, registry) = setup();
        let first = SubscriberId::next();
        let second = SubscriberId::next();
        let (second_count, second_callbacks) = counter();

        let callbacks = Callbacks::new().on_insert({
            let registry = registry.clone();
            move |_| registry.unsubscribe("profiles", second)
        });

        registry.subscribe_with_id("profiles", first, callbacks);
        registry.subscribe_with_id("profiles", second, second_callbacks);

        transport.publish("profiles", &ChangeEvent::insert("profiles", json!({})));

        assert_eq!(second_count.load(Ordering::SeqCst), 0);
        assert_eq!(registry.subscriber_count("profiles"), 1);
    }

    #[test]
    fn test_close_all() {
        let (transport, registry) = setup();
        registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());
        registry.subscribe_with_id("guardians", SubscriberId::next(), Callbacks::new());

        assert_eq!(registry.resources(), vec!["guardians".to_string(), "profiles".to_string()]);
        assert_eq!(registry.close_all(), 2);
        assert_eq!(transport.close_count(), 2);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn test_channel_info_counts_events() {
        let (transport, registry) = setup();
        registry.subscribe_with_id("profiles", SubscriberId::next(), Callbacks::new());
        transport.publish("profiles", &ChangeEvent::insert("profiles", json!({})));
        transport.publish("profiles", &ChangeEvent::delete("profiles", json!({})));

        let info = registry.channel_info("profiles").unwrap();
        assert_eq!(info.events_dispatched, 2);
        assert_eq!(info.topic, "realtime:public:profiles");
        assert!(registry.channel_info("guardians").is_none());
    }
}
