//! In-memory store backends
//!
//! Reference implementations of [`DocumentStore`] and [`BlobStore`] backed by
//! process memory. They exist for tests, local development, and as the
//! smallest possible example of what a transport has to provide; they are not
//! a storage engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::document::{DocumentSnapshot, FieldMap};
use crate::error::SyncError;
use crate::storage::BlobStore;
use crate::store::{CollectionEvent, DocumentEvent, DocumentStore};

/// Process-wide shared instance, mirroring the one-client-per-process shape
/// most vendor SDKs expose.
static SHARED: Lazy<MemoryStore> = Lazy::new(MemoryStore::new);

/// In-memory [`DocumentStore`].
///
/// Documents live in an ordered map per collection, so query and collection
/// notification order is deterministic (lexicographic by document ID).
/// Cloning is cheap; all clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Document>>,
    doc_watchers: HashMap<(String, String), Vec<mpsc::UnboundedSender<DocumentEvent>>>,
    collection_watchers: HashMap<String, Vec<mpsc::UnboundedSender<CollectionEvent>>>,
}

struct Document {
    fields: FieldMap,
    update_time: DateTime<Utc>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the process-wide shared store
    pub fn shared() -> Self {
        SHARED.clone()
    }

    fn snapshot_in(state: &State, collection: &str, id: &str) -> DocumentSnapshot {
        match state.collections.get(collection).and_then(|docs| docs.get(id)) {
            Some(doc) => DocumentSnapshot::new(collection, id, doc.fields.clone())
                .with_update_time(doc.update_time),
            None => DocumentSnapshot::missing(collection, id),
        }
    }

    fn snapshots_in(state: &State, collection: &str) -> Vec<DocumentSnapshot> {
        state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| {
                        DocumentSnapshot::new(collection, id.clone(), doc.fields.clone())
                            .with_update_time(doc.update_time)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fan a change out to everyone watching the document or its collection.
    /// Senders whose receiving stream is gone are pruned here.
    fn notify(state: &mut State, collection: &str, id: &str) {
        let doc_event: DocumentEvent = Ok(Self::snapshot_in(state, collection, id));
        let key = (collection.to_string(), id.to_string());
        let drained = match state.doc_watchers.get_mut(&key) {
            Some(watchers) => {
                watchers.retain(|tx| tx.send(doc_event.clone()).is_ok());
                watchers.is_empty()
            }
            None => false,
        };
        if drained {
            state.doc_watchers.remove(&key);
        }

        let set_event: CollectionEvent = Ok(Self::snapshots_in(state, collection));
        let drained = match state.collection_watchers.get_mut(collection) {
            Some(watchers) => {
                watchers.retain(|tx| tx.send(set_event.clone()).is_ok());
                watchers.is_empty()
            }
            None => false,
        };
        if drained {
            state.collection_watchers.remove(collection);
        }
    }
}

impl DocumentStore for MemoryStore {
    type DocumentEvents = UnboundedReceiverStream<DocumentEvent>;
    type CollectionEvents = UnboundedReceiverStream<CollectionEvent>;

    async fn get(&self, collection: &str, id: &str) -> Result<DocumentSnapshot, SyncError> {
        let state = self.state.read().await;
        Ok(Self::snapshot_in(&state, collection, id))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: FieldMap,
        merge: bool,
    ) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let docs = state.collections.entry(collection.to_string()).or_default();
        let now = Utc::now();
        match docs.get_mut(id) {
            Some(doc) if merge => {
                doc.fields.extend(fields);
                doc.update_time = now;
            }
            Some(doc) => {
                doc.fields = fields;
                doc.update_time = now;
            }
            None => {
                docs.insert(
                    id.to_string(),
                    Document {
                        fields,
                        update_time: now,
                    },
                );
            }
        }
        Self::notify(&mut state, collection, id);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: FieldMap) -> Result<String, SyncError> {
        let id: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(20)
            .map(char::from)
            .collect();
        self.set(collection, &id, fields, false).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let removed = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        // Deleting a missing document is a success and notifies nobody.
        if removed {
            Self::notify(&mut state, collection, id);
        }
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<DocumentSnapshot>, SyncError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| doc.fields.get(field) == Some(value))
                    .map(|(id, doc)| {
                        DocumentSnapshot::new(collection, id.clone(), doc.fields.clone())
                            .with_update_time(doc.update_time)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn watch(&self, collection: &str, id: &str) -> Self::DocumentEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;
        // Initial event and registration happen under one lock so no write
        // can slip between them.
        let _ = tx.send(Ok(Self::snapshot_in(&state, collection, id)));
        state
            .doc_watchers
            .entry((collection.to_string(), id.to_string()))
            .or_default()
            .push(tx);
        UnboundedReceiverStream::new(rx)
    }

    async fn watch_collection(&self, collection: &str) -> Self::CollectionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;
        let _ = tx.send(Ok(Self::snapshots_in(&state, collection)));
        state
            .collection_watchers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        UnboundedReceiverStream::new(rx)
    }
}

/// In-memory [`BlobStore`].
///
/// Download URLs use the `memory://` scheme and resolve only for paths that
/// were actually uploaded.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Blob>>>,
}

struct Blob {
    bytes: Vec<u8>,
    content_type: String,
}

impl MemoryBlobStore {
    /// Create an empty blob store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the raw bytes stored at a path
    pub async fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).map(|b| b.bytes.clone())
    }

    /// Get the content type recorded for a path
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|b| b.content_type.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), SyncError> {
        self.blobs.write().await.insert(
            path.to_string(),
            Blob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        let blobs = self.blobs.read().await;
        let mut paths: Vec<String> = blobs
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn download_url(&self, path: &str) -> Result<String, SyncError> {
        if self.blobs.read().await.contains_key(path) {
            Ok(format!("memory://{path}"))
        } else {
            Err(SyncError::NotFound)
        }
    }
}
