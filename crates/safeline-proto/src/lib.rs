//! safeline protocol types.
//!
//! This crate defines the payloads that flow through a realtime change feed:
//! the change events delivered for a resource, the connection status values
//! reported by a transport, and validated resource keys.
//!
//! # Modules
//!
//! - [`event`] - Change events and change types
//! - [`status`] - Channel connection status
//! - [`resource`] - Resource key validation
//! - [`error`] - Protocol error types

pub mod error;
pub mod event;
pub mod resource;
pub mod status;

pub use error::Error;

pub use event::{ChangeEvent, ChangeType};
pub use resource::{ResourceKey, MAX_RESOURCE_KEY_LEN};
pub use status::ChannelStatus;

/// Default database schema for change feeds.
pub const DEFAULT_SCHEMA: &str = "public";
