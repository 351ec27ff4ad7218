//! Notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a notification, used for settings filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// An SOS alert raised by the user or a contact.
    Sos,
    /// Guardian invitations, acceptances and location updates.
    Guardian,
    /// Safety diary reminders.
    Diary,
    /// Everything else.
    System,
}

/// A notification shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn new(id: impl Into<String>, kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            body: String::new(),
            created_at: Utc::now(),
            read: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Just the id of a row, for deletes that carry only the key.
#[derive(Debug, Deserialize)]
pub(crate) struct NotificationRef {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_row_with_defaults() {
        let row = json!({"id": "n-1", "kind": "sos", "title": "SOS from Sam"});
        let notification: Notification = serde_json::from_value(row).unwrap();

        assert_eq!(notification.kind, NotificationKind::Sos);
        assert!(notification.body.is_empty());
        assert!(!notification.read);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let row = json!({"id": "n-1", "kind": "marketing", "title": "hi"});
        assert!(serde_json::from_value::<Notification>(row).is_err());
    }
}
