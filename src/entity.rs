//! Entity contract
//!
//! Defines the two-way mapping between a typed domain entity and the store's
//! field-map representation. Concrete entity kinds implement [`Entity`];
//! long-lived local copies that track remote changes additionally implement
//! [`Listenable`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::document::{DocumentSnapshot, FieldMap};
use crate::error::SyncError;

/// A domain value mapped to exactly one remote document.
///
/// Each entity kind is pinned to one collection at compile time via
/// [`Entity::COLLECTION`]; the collection is never derived from instance
/// data. The `id` is stable for the entity's lifetime and reassigned only
/// when reconciling a store-generated identifier after a create.
///
/// # Example
/// ```
/// use docsync::{DocumentSnapshot, Entity, FieldMap};
/// use serde_json::json;
///
/// struct Profile {
///     id: String,
///     name: String,
/// }
///
/// impl Entity for Profile {
///     const COLLECTION: &'static str = "profiles";
///
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = id;
///     }
///
///     fn to_fields(&self) -> FieldMap {
///         let mut fields = FieldMap::new();
///         fields.insert("name".to_string(), json!(self.name));
///         fields
///     }
///
///     fn from_snapshot(snapshot: &DocumentSnapshot) -> Option<Self> {
///         let name = snapshot.get("name")?.as_str()?.to_string();
///         Some(Profile { id: snapshot.id.clone(), name })
///     }
/// }
/// ```
pub trait Entity: Sized + Send + 'static {
    /// Collection this entity kind lives in, fixed per type
    const COLLECTION: &'static str;

    /// Document ID of this entity
    fn id(&self) -> &str;

    /// Replace the ID. Intended for reconciling a store-generated ID after
    /// a create; callers should not rename entities mid-lifetime.
    fn set_id(&mut self, id: String);

    /// Serialize to the store's field-map representation.
    ///
    /// Pure and infallible: an entity that exists can always be rendered.
    fn to_fields(&self) -> FieldMap;

    /// Construct from a raw document snapshot.
    ///
    /// Returns `None` when the snapshot does not exist or required fields
    /// are missing or malformed. This is a recoverable condition, not an
    /// error.
    fn from_snapshot(snapshot: &DocumentSnapshot) -> Option<Self>;
}

/// An [`Entity`] whose local copy can be updated in place from a
/// freshly-received field map.
///
/// `apply` only touches fields present in the map, preserving local-only
/// state the store knows nothing about. This keeps one long-lived value
/// current across listener deliveries instead of reconstructing it fresh.
pub trait Listenable: Entity + Clone {
    /// Merge remote fields into this entity in place
    fn apply(&mut self, fields: &FieldMap);
}

/// Build a nested entity out of a field map, if the initializer accepts it.
pub fn object_from<T>(fields: &FieldMap, init: impl FnOnce(&FieldMap) -> Option<T>) -> Option<T> {
    init(fields)
}

/// Build entities out of an array of dynamic values, dropping elements that
/// are not maps or that the initializer rejects.
pub fn array_from<T>(values: &[Value], init: impl Fn(&FieldMap) -> Option<T>) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| value.as_object().and_then(&init))
        .collect()
}

/// Render any `Serialize` value as a field map.
///
/// Convenience for entity impls that delegate `to_fields` to a serde derive.
/// Fails when the value does not serialize to a map at the top level.
pub fn to_field_map<T: Serialize>(value: &T) -> Result<FieldMap, SyncError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SyncError::invalid(format!(
            "expected a map at the top level, got {other}"
        ))),
        Err(e) => Err(SyncError::invalid(e.to_string())),
    }
}

/// Read any `DeserializeOwned` value back out of a field map.
///
/// Returns `None` on shape mismatch, in line with the recoverable
/// `from_snapshot` contract.
pub fn from_field_map<T: DeserializeOwned>(fields: &FieldMap) -> Option<T> {
    serde_json::from_value(Value::Object(fields.clone())).ok()
}
