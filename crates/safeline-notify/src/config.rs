//! Notification center configuration.

use std::path::PathBuf;

use safeline_proto::ResourceKey;

use crate::error::{Error, Result};

/// Default settings file location.
pub const DEFAULT_SETTINGS_PATH: &str = "./safeline/notification-settings.json";

/// Default number of notifications kept in memory.
pub const DEFAULT_MAX_RETAINED: usize = 100;

/// Default resource carrying notification rows.
pub const DEFAULT_RESOURCE: &str = "notifications";

/// Notification center configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Where notification settings are persisted.
    pub settings_path: PathBuf,

    /// Maximum notifications kept; the oldest are dropped first.
    pub max_retained: usize,

    /// Realtime resource to listen on.
    pub resource: String,
}

impl NotifyConfig {
    /// Create a configuration persisting settings at `settings_path`.
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            max_retained: DEFAULT_MAX_RETAINED,
            resource: DEFAULT_RESOURCE.to_string(),
        }
    }

    /// Set the retention limit.
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained;
        self
    }

    /// Set the realtime resource.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retained == 0 {
            return Err(Error::Config("max_retained must be at least 1".into()));
        }
        ResourceKey::parse(self.resource.as_str())?;
        Ok(())
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}
