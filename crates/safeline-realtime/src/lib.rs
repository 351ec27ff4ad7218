//! safeline realtime - shared change-feed subscriptions.
//!
//! A [`ChannelRegistry`] keeps at most one live transport subscription per
//! resource key and fans every incoming [`ChangeEvent`] out to all of the
//! callback sets registered for that key. Call sites hold a
//! [`SubscriberHandle`]; connectivity is read through a [`StatusObserver`].
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use safeline_realtime::{Callbacks, ChannelRegistry, LocalTransport, RealtimeConfig};
//!
//! let transport = Arc::new(LocalTransport::new().with_auto_connect());
//! let registry = ChannelRegistry::new(transport.clone(), RealtimeConfig::default())?;
//!
//! let handle = registry.subscribe(
//!     "sos_alerts",
//!     Callbacks::new().on_insert(|event| println!("new alert: {:?}", event.new_record)),
//! );
//!
//! assert!(registry.is_connected("sos_alerts"));
//! handle.unsubscribe();
//! ```

pub mod callbacks;
pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod observer;
pub mod registry;
pub mod transport;

pub use callbacks::{CallbackCell, Callbacks, EventCallback};
pub use channel::{ChannelInfo, SubscriberId};
pub use config::RealtimeConfig;
pub use error::Error;
pub use handle::SubscriberHandle;
pub use observer::StatusObserver;
pub use registry::{ChannelRegistry, ChannelSink};
pub use transport::{ChannelSpec, LocalTransport, Transport, TransportHandle};

/// Re-export protocol types.
pub use safeline_proto as proto;
pub use safeline_proto::{ChangeEvent, ChangeType, ChannelStatus};
