//! Generic entity sync operations
//!
//! [`EntityManager`] is the mapping layer between typed entities and the
//! untyped document store behind [`DocumentStore`]: CRUD parameterized over
//! any [`Entity`], plus a bridge that turns the store's push notifications
//! into typed callback deliveries on one serialized context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::document::FieldMap;
use crate::entity::{Entity, Listenable};
use crate::error::SyncError;
use crate::listener::{Dispatcher, ListenerRegistration};
use crate::store::DocumentStore;

/// Entity sync adapter over a document-store transport.
///
/// Cloning is cheap and every clone shares the same store handle and
/// callback dispatcher. CRUD calls are independent asynchronous operations
/// that may run concurrently with each other and with listener deliveries;
/// the manager performs no cross-operation locking, no retries, and imposes
/// no timeouts of its own.
pub struct EntityManager<S: DocumentStore> {
    inner: Arc<ManagerInner<S>>,
}

struct ManagerInner<S> {
    store: S,
    dispatcher: Dispatcher,
}

impl<S: DocumentStore> Clone for EntityManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore> EntityManager<S> {
    /// Create a manager over the given store.
    ///
    /// Spawns the callback dispatcher task, so this must be called from
    /// within a Tokio runtime.
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                store,
                dispatcher: Dispatcher::spawn(),
            }),
        }
    }

    /// Get the underlying store handle
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Read the document behind `entity` and construct a fresh instance.
    ///
    /// Returns `Ok(None)` when the document does not exist or the snapshot
    /// is rejected by [`Entity::from_snapshot`]; transport failures come
    /// back as `Err`, distinct from absence.
    pub async fn fetch<T: Entity>(&self, entity: &T) -> Result<Option<T>, SyncError> {
        let snapshot = self.inner.store.get(T::COLLECTION, entity.id()).await?;
        if !snapshot.exists() {
            return Ok(None);
        }
        let decoded = T::from_snapshot(&snapshot);
        if decoded.is_none() {
            debug!(
                collection = T::COLLECTION,
                id = entity.id(),
                "snapshot rejected by entity decoder"
            );
        }
        Ok(decoded)
    }

    /// Insert `entity` under a store-generated ID and return that ID.
    ///
    /// The entity's own `id` is ignored for the write; the caller is
    /// responsible for reconciling the returned ID back into its local
    /// copy (see [`Entity::set_id`]).
    pub async fn create<T: Entity>(&self, entity: &T) -> Result<String, SyncError> {
        self.inner.store.add(T::COLLECTION, entity.to_fields()).await
    }

    /// Upsert `entity` at its own ID.
    ///
    /// With `merge = true`, fields absent from the entity's map are left
    /// untouched in the store. With `merge = false` the document is
    /// replaced wholesale: any prior fields not present in the map are
    /// lost, so a partial entity written without merge silently drops the
    /// rest of the document.
    pub async fn put<T: Entity>(&self, entity: &T, merge: bool) -> Result<(), SyncError> {
        debug!(
            collection = T::COLLECTION,
            id = entity.id(),
            merge,
            "writing document"
        );
        self.inner
            .store
            .set(T::COLLECTION, entity.id(), entity.to_fields(), merge)
            .await
    }

    /// Delete one document. Deleting a document that does not exist
    /// succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        self.inner.store.delete(collection, id).await
    }

    /// Check whether a document exists
    pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, SyncError> {
        Ok(self.inner.store.get(collection, id).await?.exists())
    }

    /// Check that no document in `collection` has `field == value`.
    ///
    /// This check and a subsequent create are not transactional: two
    /// concurrent callers can both observe uniqueness and both insert.
    /// Callers that need a hard guarantee must enforce it store-side.
    pub async fn is_field_unique(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, SyncError> {
        let matches = self.inner.store.query_eq(collection, field, value).await?;
        Ok(matches.is_empty())
    }

    /// Read an array-of-maps field out of one document.
    ///
    /// Returns an empty vec when the document or the field is absent, and
    /// [`SyncError::InvalidSnapshot`] when the field exists but is not an
    /// array of maps.
    pub async fn dependent_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
    ) -> Result<Vec<FieldMap>, SyncError> {
        let snapshot = self.inner.store.get(collection, id).await?;
        let Some(data) = &snapshot.data else {
            return Ok(Vec::new());
        };
        match data.get(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_object().cloned().ok_or_else(|| {
                        SyncError::invalid(format!("element of `{field}` is not a map"))
                    })
                })
                .collect(),
            Some(_) => Err(SyncError::invalid(format!("field `{field}` is not an array"))),
        }
    }

    /// Subscribe to the document behind `entity` with a callback.
    ///
    /// On every store notification: a transport error is delivered as
    /// `Err`; a missing document as `Err(NotFound)`; otherwise the
    /// manager-held copy of `entity` is updated in place via
    /// [`Listenable::apply`] (so local-only fields survive) and a clone of
    /// it is delivered as `Ok`. Errors do not terminate the subscription.
    ///
    /// All callbacks of this manager run on one dispatcher task: FIFO per
    /// registration, serialized across registrations, with no cross-
    /// registration ordering guarantee.
    pub fn observe<T, F>(&self, entity: T, on_change: F) -> ListenerRegistration
    where
        T: Listenable,
        F: FnMut(Result<T, SyncError>) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let flag = Arc::clone(&active);
        let callback = Arc::new(Mutex::new(on_change));

        tokio::spawn(async move {
            let mut entity = entity;
            let mut events = inner.store.watch(T::COLLECTION, entity.id()).await;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    event = events.next() => {
                        let Some(event) = event else { break };
                        let delivery = match event {
                            Err(e) => {
                                warn!(
                                    collection = T::COLLECTION,
                                    id = entity.id(),
                                    error = %e,
                                    "listener transport error"
                                );
                                Err(e)
                            }
                            Ok(snapshot) => match snapshot.data {
                                None => {
                                    debug!(
                                        collection = T::COLLECTION,
                                        id = entity.id(),
                                        "watched document no longer exists"
                                    );
                                    Err(SyncError::NotFound)
                                }
                                Some(fields) => {
                                    entity.apply(&fields);
                                    Ok(entity.clone())
                                }
                            },
                        };
                        let callback = Arc::clone(&callback);
                        let flag = Arc::clone(&flag);
                        inner.dispatcher.enqueue(Box::new(move || {
                            if flag.load(Ordering::SeqCst) {
                                if let Ok(mut cb) = callback.lock() {
                                    (*cb)(delivery);
                                }
                            }
                        }));
                    }
                }
            }
        });

        ListenerRegistration::new(active, cancel_tx)
    }

    /// Subscribe to a whole collection with a callback.
    ///
    /// On every notification the entire matching set is re-materialized,
    /// one [`Entity::from_snapshot`] per document, in the store's return
    /// order; snapshots the decoder rejects are dropped. Delivery rules
    /// match [`observe`](EntityManager::observe).
    pub fn observe_collection<T, F>(&self, on_change: F) -> ListenerRegistration
    where
        T: Entity,
        F: FnMut(Result<Vec<T>, SyncError>) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let flag = Arc::clone(&active);
        let callback = Arc::new(Mutex::new(on_change));

        tokio::spawn(async move {
            let mut events = inner.store.watch_collection(T::COLLECTION).await;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    event = events.next() => {
                        let Some(event) = event else { break };
                        let delivery = match event {
                            Err(e) => {
                                warn!(
                                    collection = T::COLLECTION,
                                    error = %e,
                                    "collection listener transport error"
                                );
                                Err(e)
                            }
                            Ok(snapshots) => {
                                let total = snapshots.len();
                                let entities: Vec<T> =
                                    snapshots.iter().filter_map(T::from_snapshot).collect();
                                if entities.len() < total {
                                    debug!(
                                        collection = T::COLLECTION,
                                        dropped = total - entities.len(),
                                        "snapshots rejected by entity decoder"
                                    );
                                }
                                Ok(entities)
                            }
                        };
                        let callback = Arc::clone(&callback);
                        let flag = Arc::clone(&flag);
                        inner.dispatcher.enqueue(Box::new(move || {
                            if flag.load(Ordering::SeqCst) {
                                if let Ok(mut cb) = callback.lock() {
                                    (*cb)(delivery);
                                }
                            }
                        }));
                    }
                }
            }
        });

        ListenerRegistration::new(active, cancel_tx)
    }

    /// Subscribe to the document behind `entity` as an async stream.
    ///
    /// Same per-event semantics as [`observe`](EntityManager::observe),
    /// without the shared dispatcher: the stream is lazy, infinite, and
    /// non-restartable, and dropping it cancels the subscription.
    pub fn watch<T>(&self, entity: T) -> impl Stream<Item = Result<T, SyncError>> + Send + Unpin
    where
        T: Listenable,
    {
        let inner = Arc::clone(&self.inner);
        Box::pin(async_stream::stream! {
            let mut entity = entity;
            let mut events = inner.store.watch(T::COLLECTION, entity.id()).await;
            while let Some(event) = events.next().await {
                match event {
                    Err(e) => yield Err(e),
                    Ok(snapshot) => match snapshot.data {
                        None => yield Err(SyncError::NotFound),
                        Some(fields) => {
                            entity.apply(&fields);
                            yield Ok(entity.clone());
                        }
                    },
                }
            }
        })
    }

    /// Subscribe to a whole collection as an async stream.
    ///
    /// Same per-event semantics as
    /// [`observe_collection`](EntityManager::observe_collection); dropping
    /// the stream cancels the subscription.
    pub fn watch_collection<T>(
        &self,
    ) -> impl Stream<Item = Result<Vec<T>, SyncError>> + Send + Unpin
    where
        T: Entity,
    {
        let inner = Arc::clone(&self.inner);
        Box::pin(async_stream::stream! {
            let mut events = inner.store.watch_collection(T::COLLECTION).await;
            while let Some(event) = events.next().await {
                yield event.map(|snapshots| {
                    snapshots.iter().filter_map(T::from_snapshot).collect()
                });
            }
        })
    }
}
