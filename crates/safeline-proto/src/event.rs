//! Change events delivered on a resource's change feed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::DEFAULT_SCHEMA;

/// Types of changes that can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// A new row was inserted.
    Insert,
    /// An existing row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl ChangeType {
    /// Wire name of the change type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change event for one row of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The type of change.
    #[serde(rename = "eventType")]
    pub change_type: ChangeType,
    /// Schema the resource lives in.
    pub schema: String,
    /// Resource (table) that changed.
    pub table: String,
    /// Row after the change. Absent for deletes.
    #[serde(rename = "new", default, skip_serializing_if = "Option::is_none")]
    pub new_record: Option<Value>,
    /// Row before the change, when the feed provides it.
    #[serde(rename = "old", default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<Value>,
    /// When the change was committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    /// Create an insert event.
    pub fn insert(table: impl Into<String>, new_record: Value) -> Self {
        Self::new(ChangeType::Insert, table, Some(new_record), None)
    }

    /// Create an update event.
    pub fn update(table: impl Into<String>, new_record: Value, old_record: Option<Value>) -> Self {
        Self::new(ChangeType::Update, table, Some(new_record), old_record)
    }

    /// Create a delete event.
    pub fn delete(table: impl Into<String>, old_record: Value) -> Self {
        Self::new(ChangeType::Delete, table, None, Some(old_record))
    }

    fn new(
        change_type: ChangeType,
        table: impl Into<String>,
        new_record: Option<Value>,
        old_record: Option<Value>,
    ) -> Self {
        Self {
            change_type,
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            new_record,
            old_record,
            commit_timestamp: Some(Utc::now()),
        }
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the commit timestamp.
    pub fn with_commit_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.commit_timestamp = Some(timestamp);
        self
    }

    /// Decode the new record into a typed row.
    pub fn decode_new<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let record = self.new_record.clone().ok_or(Error::MissingRecord("new"))?;
        Ok(serde_json::from_value(record)?)
    }

    /// Decode the old record into a typed row.
    pub fn decode_old<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let record = self.old_record.clone().ok_or(Error::MissingRecord("old"))?;
        Ok(serde_json::from_value(record)?)
    }
}
