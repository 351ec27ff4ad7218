//! safeline notifications - local notification state.
//!
//! [`NotificationCenter`] keeps the in-memory list of notifications shown to
//! the user, filters incoming ones through [`NotificationSettings`], and
//! persists those settings as JSON through a [`SettingsStore`]. New rows on
//! the notifications resource arrive through a realtime subscription.

pub mod center;
pub mod config;
pub mod error;
pub mod notification;
pub mod settings;

pub use center::NotificationCenter;
pub use config::NotifyConfig;
pub use error::Error;
pub use notification::{Notification, NotificationKind};
pub use settings::{NotificationSettings, SettingsStore};
