//! Docsync
//!
//! Typed entity synchronization over document-oriented datastores.
//!
//! Entities declare how they map to a document (collection, ID, field map)
//! via the [`Entity`] contract; [`EntityManager`] provides generic CRUD and
//! push subscriptions over any transport implementing [`DocumentStore`].
//! An in-memory backend ([`MemoryStore`]) ships for tests and local use.
//!
//! # Example
//! ```
//! use docsync::{DocumentSnapshot, Entity, EntityManager, FieldMap, MemoryStore};
//! use serde_json::json;
//!
//! #[derive(Clone)]
//! struct Profile {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Entity for Profile {
//!     const COLLECTION: &'static str = "profiles";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//!
//!     fn to_fields(&self) -> FieldMap {
//!         let mut fields = FieldMap::new();
//!         fields.insert("name".to_string(), json!(self.name));
//!         fields
//!     }
//!
//!     fn from_snapshot(snapshot: &DocumentSnapshot) -> Option<Self> {
//!         let name = snapshot.get("name")?.as_str()?.to_string();
//!         Some(Profile { id: snapshot.id.clone(), name })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = EntityManager::new(MemoryStore::new());
//!
//! let mut profile = Profile { id: String::new(), name: "alice".to_string() };
//! let id = manager.create(&profile).await.unwrap();
//! profile.set_id(id);
//!
//! let fetched = manager.fetch(&profile).await.unwrap().unwrap();
//! assert_eq!(fetched.name, "alice");
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod entity;
pub mod error;
pub mod listener;
pub mod manager;
pub mod memory;
pub mod storage;
pub mod store;

// Re-exports for convenience
pub use document::{DocumentSnapshot, FieldMap};
pub use entity::{Entity, Listenable};
pub use error::SyncError;
pub use listener::ListenerRegistration;
pub use manager::EntityManager;
pub use memory::{MemoryBlobStore, MemoryStore};
pub use storage::{BlobStore, MediaStore};
pub use store::{CollectionEvent, DocumentEvent, DocumentStore};
