//! Per-subscriber callback sets.
//!
//! A subscriber registers up to three kind-specific handlers plus an
//! optional catch-all. The registry stores a [`CallbackCell`] rather than the
//! callbacks themselves, so a call site can swap its handlers at any time
//! without touching the underlying channel.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use safeline_proto::{ChangeEvent, ChangeType};

/// Handler invoked with a change event.
pub type EventCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Shared, swappable slot holding a subscriber's current callbacks.
pub type CallbackCell = Arc<RwLock<Callbacks>>;

/// Callback set for one subscriber.
///
/// All handlers are optional.
#[derive(Clone, Default)]
pub struct Callbacks {
    on_insert: Option<EventCallback>,
    on_update: Option<EventCallback>,
    on_delete: Option<EventCallback>,
    on_change: Option<EventCallback>,
}

impl Callbacks {
    /// Create an empty callback set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle inserted rows.
    pub fn on_insert<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_insert = Some(Arc::new(f));
        self
    }

    /// Handle updated rows.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(f));
        self
    }

    /// Handle deleted rows.
    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_delete = Some(Arc::new(f));
        self
    }

    /// Handle every event, after the kind-specific handler.
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(f));
        self
    }

    /// Handler registered for a change type, if any.
    pub fn handler_for(&self, change_type: ChangeType) -> Option<&EventCallback> {
        match change_type {
            ChangeType::Insert => self.on_insert.as_ref(),
            ChangeType::Update => self.on_update.as_ref(),
            ChangeType::Delete => self.on_delete.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.on_insert.is_none()
            && self.on_update.is_none()
            && self.on_delete.is_none()
            && self.on_change.is_none()
    }

    /// Invoke the matching handlers. Returns how many ran.
    pub fn dispatch(&self, event: &ChangeEvent) -> usize {
        let mut invoked = 0;
        if let Some(handler) = self.handler_for(event.change_type) {
            handler(event);
            invoked += 1;
        }
        if let Some(handler) = &self.on_change {
            handler(event);
            invoked += 1;
        }
        invoked
    }

    /// Wrap into a fresh cell.
    pub fn into_cell(self) -> CallbackCell {
        Arc::new(RwLock::new(self))
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_insert", &self.on_insert.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
