//! Realtime configuration.

use std::time::Duration;

use safeline_proto::DEFAULT_SCHEMA;

use crate::error::Error;

/// Default prefix for transport topics.
pub const DEFAULT_TOPIC_PREFIX: &str = "realtime";

/// Default interval for the diagnostic status poller.
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Realtime registry configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Schema that resources live in (e.g., "public").
    pub schema: String,

    /// Prefix for the topic names handed to the transport.
    pub topic_prefix: String,

    /// Interval for diagnostic status polling. None disables the poller.
    ///
    /// Status callbacks from the transport are authoritative; the poller
    /// only observes and logs.
    pub status_poll_interval: Option<Duration>,
}

impl RealtimeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            status_poll_interval: Some(DEFAULT_STATUS_POLL_INTERVAL),
        }
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the topic prefix.
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Set the diagnostic poll interval.
    pub fn with_status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = Some(interval);
        self
    }

    /// Disable the diagnostic poller.
    pub fn without_status_poll(mut self) -> Self {
        self.status_poll_interval = None;
        self
    }

    /// Topic name for a resource: `{prefix}:{schema}:{resource}`.
    pub fn topic_for(&self, resource: &str) -> String {
        format!("{}:{}:{}", self.topic_prefix, self.schema, resource)
    }

    /// Check the configuration for values the transport cannot route.
    pub fn validate(&self) -> Result<(), Error> {
        if self.schema.is_empty() {
            return Err(Error::Config("schema must not be empty".into()));
        }
        if self.topic_prefix.is_empty() {
            return Err(Error::Config("topic prefix must not be empty".into()));
        }
        if self.schema.contains(':') || self.topic_prefix.contains(':') {
            return Err(Error::Config("schema and topic prefix must not contain ':'".into()));
        }
        if self.status_poll_interval == Some(Duration::ZERO) {
            return Err(Error::Config("status poll interval must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
