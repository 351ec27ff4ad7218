//! Notification center: in-memory notification state plus persisted settings.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use safeline_proto::ChangeEvent;
use safeline_realtime::{Callbacks, ChannelRegistry, SubscriberHandle};

use crate::config::NotifyConfig;
use crate::error::Result;
use crate::notification::{Notification, NotificationRef};
use crate::settings::{NotificationSettings, SettingsStore};

/// Local notification state for one user session.
pub struct NotificationCenter {
    config: NotifyConfig,
    store: SettingsStore,
    settings: RwLock<NotificationSettings>,
    /// Newest first.
    notifications: RwLock<VecDeque<Notification>>,
}

impl NotificationCenter {
    /// Open a center, loading persisted settings.
    pub fn open(config: NotifyConfig) -> Result<Self> {
        config.validate()?;
        let store = SettingsStore::new(config.settings_path.clone());
        let settings = store.load()?;

        info!(
            settings_path = %store.path().display(),
            resource = %config.resource,
            "notification center opened"
        );

        Ok(Self {
            config,
            store,
            settings: RwLock::new(settings),
            notifications: RwLock::new(VecDeque::new()),
        })
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// Add a notification.
    ///
    /// Returns false if settings filter it out or its id is already present.
    pub fn push(&self, notification: Notification) -> bool {
        if !self.settings.read().allows(notification.kind) {
            debug!(id = %notification.id, kind = ?notification.kind, "notification muted by settings");
            return false;
        }

        let mut notifications = self.notifications.write();
        if notifications.iter().any(|n| n.id == notification.id) {
            return false;
        }
        notifications.push_front(notification);
        notifications.truncate(self.config.max_retained);
        true
    }

    /// Replace a notification in place.
    ///
    /// Returns false if the id is unknown, or if settings mute the new kind;
    /// in that case the stored copy is dropped.
    pub fn replace(&self, notification: Notification) -> bool {
        let allowed = self.settings.read().allows(notification.kind);
        let mut notifications = self.notifications.write();
        let Some(index) = notifications.iter().position(|n| n.id == notification.id) else {
            return false;
        };

        if !allowed {
            debug!(id = %notification.id, kind = ?notification.kind, "notification muted by settings");
            notifications.remove(index);
            return false;
        }
        notifications[index] = notification;
        true
    }

    /// All notifications, newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.notifications.read().iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Notification> {
        self.notifications.read().iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.notifications.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.read().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.read().iter().filter(|n| !n.read).count()
    }

    /// Mark one notification read. Returns true if it was unread.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut notifications = self.notifications.write();
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.read => {
                notification.read = true;
                true
            }
            _ => false,
        }
    }

    /// Mark everything read. Returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        let mut changed = 0;
        for notification in self.notifications.write().iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut notifications = self.notifications.write();
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        notifications.len() != before
    }

    pub fn clear(&self) {
        self.notifications.write().clear();
    }

    pub fn settings(&self) -> NotificationSettings {
        self.settings.read().clone()
    }

    /// Change settings and persist them.
    ///
    /// The in-memory settings change only after the file was written.
    /// Updates are serialized; `update` must not call back into the center.
    pub fn update_settings<F>(&self, update: F) -> Result<NotificationSettings>
    where
        F: FnOnce(&mut NotificationSettings),
    {
        let mut settings = self.settings.write();
        let mut next = settings.clone();
        update(&mut next);
        self.store.save(&next)?;
        *settings = next.clone();
        Ok(next)
    }

    /// Subscribe to the configured resource on `registry`.
    ///
    /// Inserted rows become notifications, updated rows replace the stored
    /// copy and deleted rows are removed. Rows that do not decode are logged
    /// and skipped. The returned handle ends the subscription when dropped.
    pub fn listen(self: &Arc<Self>, registry: &ChannelRegistry) -> SubscriberHandle {
        let on_insert = Arc::downgrade(self);
        let on_update = Arc::downgrade(self);
        let on_delete = Arc::downgrade(self);

        let callbacks = Callbacks::new()
            .on_insert(move |event| {
                with_center(&on_insert, |center| match event.decode_new::<Notification>() {
                    Ok(notification) => {
                        center.push(notification);
                    }
                    Err(error) => log_undecodable(event, &error),
                })
            })
            .on_update(move |event| {
                with_center(&on_update, |center| match event.decode_new::<Notification>() {
                    Ok(notification) => {
                        if !center.replace(notification.clone()) {
                            center.push(notification);
                        }
                    }
                    Err(error) => log_undecodable(event, &error),
                })
            })
            .on_delete(move |event| {
                with_center(&on_delete, |center| match event.decode_old::<NotificationRef>() {
                    Ok(row) => {
                        center.remove(&row.id);
                    }
                    Err(error) => log_undecodable(event, &error),
                })
            });

        registry.subscribe(self.config.resource.clone(), callbacks)
    }
}

fn with_center(center: &Weak<NotificationCenter>, f: impl FnOnce(&NotificationCenter)) {
    if let Some(center) = center.upgrade() {
        f(&center);
    }
}

fn log_undecodable(event: &ChangeEvent, error: &safeline_proto::Error) {
    warn!(
        table = %event.table,
        change_type = %event.change_type,
        %error,
        "skipping undecodable notification row"
    );
}
