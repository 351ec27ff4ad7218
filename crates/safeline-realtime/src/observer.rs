//! Connection status observation.
//!
//! A [`StatusObserver`] holds only a resource key. Every query goes back to
//! the registry, because channels are torn down and recreated as subscriber
//! populations change.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use safeline_proto::ChannelStatus;

use crate::registry::ChannelRegistry;

/// Read-only view of one resource's connection status.
#[derive(Clone)]
pub struct StatusObserver {
    registry: ChannelRegistry,
    resource: String,
}

impl StatusObserver {
    pub(crate) fn new(registry: ChannelRegistry, resource: String) -> Self {
        Self { registry, resource }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_connected(&self) -> bool {
        self.registry.is_connected(&self.resource)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscriber_count(&self.resource)
    }

    /// Last reported status, None if there is no channel.
    pub fn status(&self) -> Option<ChannelStatus> {
        self.registry.status(&self.resource)
    }

    /// Spawn a diagnostic poller at the configured interval.
    ///
    /// Returns None when polling is disabled in the registry config.
    pub fn spawn_default_poller(&self) -> Option<JoinHandle<()>> {
        let interval = self.registry.config().status_poll_interval?;
        Some(self.spawn_poller(interval, |_| {}))
    }

    /// Spawn a task that samples the status every `interval` and calls
    /// `on_change` whenever the sampled value differs from the last one.
    ///
    /// The poller only observes; status transitions reported by the transport
    /// are authoritative. It exits once the registry is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn spawn_poller<F>(&self, interval: Duration, mut on_change: F) -> JoinHandle<()>
    where
        F: FnMut(Option<ChannelStatus>) + Send + 'static,
    {
        assert!(!interval.is_zero(), "status poll interval must be non-zero");
        let registry = self.registry.downgrade();
        let resource = self.resource.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last: Option<Option<ChannelStatus>> = None;

            loop {
                ticker.tick().await;
                let Some(inner) = registry.upgrade() else {
                    debug!(resource = %resource, "registry dropped, status poller exiting");
                    break;
                };
                let current = ChannelRegistry::from_inner(inner);
                let status = current.status(&resource);

                if last != Some(status) {
                    debug!(
                        resource = %resource,
                        status = ?status,
                        subscribers = current.subscriber_count(&resource),
                        "polled channel status"
                    );
                    on_change(status);
                    last = Some(status);
                }
            }
        })
    }
}
