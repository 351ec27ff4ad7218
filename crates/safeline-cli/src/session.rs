//! A realtime session on the loopback transport.
//!
//! The session attaches several subscribers to one resource, wires the
//! notification center to the notifications resource, pushes a batch of
//! events through the transport, detaches half of the subscribers and
//! collects what every party saw.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use safeline_notify::NotificationCenter;
use safeline_proto::{ChangeEvent, ChannelStatus};
use safeline_realtime::{Callbacks, ChannelInfo, ChannelRegistry, LocalTransport};

use crate::config::SessionConfig;
use crate::error::Error;

/// What a session observed.
#[derive(Debug)]
pub struct SessionReport {
    /// Channels alive just before shutdown.
    pub channels: Vec<ChannelInfo>,
    /// Events each subscriber received, in subscription order.
    pub received: Vec<usize>,
    pub opens: usize,
    pub closes: usize,
    pub notifications: usize,
    pub unread: usize,
}

/// Run one session and return its report.
pub async fn run(config: SessionConfig) -> Result<SessionReport, Error> {
    let transport = Arc::new(LocalTransport::new().with_auto_connect());
    transport.set_fail_opens(config.fail_open);
    let registry = ChannelRegistry::new(transport.clone(), config.realtime.clone())?;

    let center = Arc::new(NotificationCenter::open(config.notify.clone())?);
    let notify_resource = center.config().resource.clone();
    let _notify_handle = center.listen(&registry);

    let resource = config.resource.as_str();
    let counters: Vec<Arc<AtomicUsize>> = (0..config.subscribers)
        .map(|_| Arc::new(AtomicUsize::new(0)))
        .collect();
    let handles: Vec<_> = counters
        .iter()
        .map(|count| {
            let count = count.clone();
            registry.subscribe(
                resource,
                Callbacks::new().on_change(move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            )
        })
        .collect();

    let poller = registry.observer(resource).spawn_default_poller();

    match registry.status(resource) {
        Some(ChannelStatus::Open) => info!(resource, "channel connected"),
        status => warn!(resource, ?status, "channel not connected"),
    }

    for n in 0..config.events {
        let event = ChangeEvent::insert(resource, json!({"id": n, "resource": resource}));
        transport.publish(resource, &event);
    }

    // Half the subscribers leave; the rest see one more update.
    for handle in handles.iter().take(handles.len() / 2) {
        handle.unsubscribe();
    }
    transport.publish(
        resource,
        &ChangeEvent::update(resource, json!({"id": 0, "resolved": true}), None),
    );

    for (n, (kind, title)) in [
        ("sos", "SOS alert received"),
        ("guardian", "Guardian request accepted"),
        ("diary", "Time to update your safety diary"),
    ]
    .into_iter()
    .enumerate()
    {
        transport.publish(
            &notify_resource,
            &ChangeEvent::insert(
                notify_resource.as_str(),
                json!({"id": format!("n-{n}"), "kind": kind, "title": title}),
            ),
        );
    }

    // Let the poller take at least one sample.
    tokio::task::yield_now().await;

    let channels = registry
        .resources()
        .iter()
        .filter_map(|resource| registry.channel_info(resource))
        .collect();

    drop(handles);
    let closed = registry.close_all();
    if let Some(poller) = poller {
        poller.abort();
    }
    info!(closed, "session finished");

    Ok(SessionReport {
        channels,
        received: counters.iter().map(|c| c.load(Ordering::SeqCst)).collect(),
        opens: transport.open_count(),
        closes: transport.close_count(),
        notifications: center.len(),
        unread: center.unread_count(),
    })
}
