//! Document-store transport capability
//!
//! The adapter depends only on this interface, never on a concrete vendor
//! client. Any backend that can get/set/delete/add/query/watch documents
//! keyed by `(collection, document id)` can sit behind it; the crate ships
//! an in-memory implementation in [`crate::memory`].

use std::future::Future;

use futures::Stream;
use serde_json::Value;

use crate::document::{DocumentSnapshot, FieldMap};
use crate::error::SyncError;

/// One push notification for a single watched document.
pub type DocumentEvent = Result<DocumentSnapshot, SyncError>;

/// One push notification for a watched collection: the entire matching set,
/// in the store's return order.
pub type CollectionEvent = Result<Vec<DocumentSnapshot>, SyncError>;

/// Capability interface over a document-oriented datastore.
///
/// All operations address documents by `(collection, id)`. Reads report
/// absence through the snapshot's existence flag, not through an error;
/// transport failures (network, permission) surface as [`SyncError`].
///
/// Watch streams are lazy, infinite, and non-restartable. The first event
/// reflects the current state at registration time; dropping the stream
/// cancels the subscription and releases store-side resources.
pub trait DocumentStore: Send + Sync + 'static {
    /// Push stream for a single document
    type DocumentEvents: Stream<Item = DocumentEvent> + Send + Unpin + 'static;

    /// Push stream for a whole collection
    type CollectionEvents: Stream<Item = CollectionEvent> + Send + Unpin + 'static;

    /// Read one document. The returned snapshot has `data: None` when the
    /// document does not exist.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<DocumentSnapshot, SyncError>> + Send;

    /// Write one document at a caller-chosen ID.
    ///
    /// With `merge = true` only the given fields are written and the rest of
    /// the document is left untouched; with `merge = false` the document is
    /// replaced wholesale and prior fields not present in `fields` are lost.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: FieldMap,
        merge: bool,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Insert a new document under a store-generated ID and return that ID.
    fn add(
        &self,
        collection: &str,
        fields: FieldMap,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;

    /// Delete one document. Deleting a document that does not exist is a
    /// success, not an error.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Return every document in `collection` whose `field` equals `value`,
    /// in the store's return order.
    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> impl Future<Output = Result<Vec<DocumentSnapshot>, SyncError>> + Send;

    /// Subscribe to one document. The first event carries the current state.
    fn watch(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Self::DocumentEvents> + Send;

    /// Subscribe to a whole collection. Every event carries the entire
    /// matching set; the first event carries the current set.
    fn watch_collection(
        &self,
        collection: &str,
    ) -> impl Future<Output = Self::CollectionEvents> + Send;
}
