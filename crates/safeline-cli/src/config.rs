//! Command-line arguments and session configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use safeline_notify::config::DEFAULT_SETTINGS_PATH;
use safeline_notify::NotifyConfig;
use safeline_proto::{ResourceKey, DEFAULT_SCHEMA};
use safeline_realtime::RealtimeConfig;

use crate::error::Error;

/// Default resource the session subscribes to.
pub const DEFAULT_RESOURCE: &str = "sos_alerts";

/// Default status poll interval in milliseconds.
pub const DEFAULT_POLL_MS: u64 = 1000;

/// Everything a session run needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub resource: ResourceKey,
    pub subscribers: usize,
    pub events: usize,
    pub fail_open: bool,
    pub realtime: RealtimeConfig,
    pub notify: NotifyConfig,
}

/// Command-line arguments for the session runner.
#[derive(Parser, Debug)]
#[command(name = "safeline")]
#[command(version, about = "Run a safeline realtime session on the loopback transport", long_about = None)]
pub struct Args {
    /// Resource to subscribe to.
    #[arg(short, long, default_value = DEFAULT_RESOURCE)]
    pub resource: String,

    /// Number of subscribers sharing the resource channel.
    #[arg(long, default_value_t = 3)]
    pub subscribers: usize,

    /// Number of insert events to publish.
    #[arg(long, default_value_t = 5)]
    pub events: usize,

    /// Schema the resources live in.
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Notification settings file.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Diagnostic status poll interval in milliseconds (0 disables).
    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    pub poll_ms: u64,

    /// Make the transport refuse to open channels.
    #[arg(long)]
    pub fail_open: bool,
}

impl Args {
    /// Validate the arguments and build a session configuration.
    pub fn into_config(self) -> Result<SessionConfig, Error> {
        let resource = ResourceKey::parse(self.resource)?;

        let mut realtime = RealtimeConfig::new().with_schema(self.schema);
        realtime = if self.poll_ms == 0 {
            realtime.without_status_poll()
        } else {
            realtime.with_status_poll_interval(Duration::from_millis(self.poll_ms))
        };
        realtime.validate()?;

        let notify = NotifyConfig::new(self.settings);
        notify.validate()?;

        Ok(SessionConfig {
            resource,
            subscribers: self.subscribers.max(1),
            events: self.events,
            fail_open: self.fail_open,
            realtime,
            notify,
        })
    }
}
