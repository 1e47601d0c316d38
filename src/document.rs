//! Document wire-shape types
//!
//! A document is exchanged with the store as a string-keyed map of dynamic
//! values. [`DocumentSnapshot`] is the read-side view: the field map plus an
//! existence flag (absence is data, not an error).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// String-keyed map of dynamic values, the wire shape of a document.
///
/// Values may be strings, numbers, bools, nested maps, or arrays of maps.
pub type FieldMap = serde_json::Map<String, Value>;

/// Point-in-time view of a single document.
///
/// `data` is `None` when the document does not exist. `update_time` is
/// informational metadata stamped by the transport and may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Collection the document lives in
    pub collection: String,

    /// Document ID within the collection
    pub id: String,

    /// Document fields (None if the document doesn't exist)
    pub data: Option<FieldMap>,

    /// When the document was last written, if the transport reports it
    pub update_time: Option<DateTime<Utc>>,
}

impl DocumentSnapshot {
    /// Create a snapshot of an existing document
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        data: FieldMap,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data: Some(data),
            update_time: None,
        }
    }

    /// Create a snapshot of a document that does not exist
    pub fn missing(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data: None,
            update_time: None,
        }
    }

    /// Attach the transport's update time
    pub fn with_update_time(mut self, update_time: DateTime<Utc>) -> Self {
        self.update_time = Some(update_time);
        self
    }

    /// Check if the document exists
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        let Some(data) = &self.data else {
            return None;
        };
        data.get(field)
    }
}
