//! Notification settings and their persistence.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::notification::NotificationKind;

/// User-facing notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Master switch for everything except SOS alerts.
    pub enabled: bool,
    pub sos_alerts: bool,
    pub guardian_updates: bool,
    pub diary_reminders: bool,
    pub sound: bool,
    pub vibration: bool,
}

impl NotificationSettings {
    /// Whether a notification of `kind` should be kept.
    ///
    /// SOS alerts bypass the master switch and are muted only by `sos_alerts`.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Sos => self.sos_alerts,
            NotificationKind::Guardian => self.enabled && self.guardian_updates,
            NotificationKind::Diary => self.enabled && self.diary_reminders,
            NotificationKind::System => self.enabled,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sos_alerts: true,
            guardian_updates: true,
            diary_reminders: true,
            sound: true,
            vibration: true,
        }
    }
}

/// JSON file holding [`NotificationSettings`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when no file exists yet.
    pub fn load(&self) -> Result<NotificationSettings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(NotificationSettings::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write settings through a temp file and rename.
    pub fn save(&self, settings: &NotificationSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(settings)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
