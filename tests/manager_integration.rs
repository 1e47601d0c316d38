//! Integration tests for generic CRUD over the in-memory store.

use docsync::{
    DocumentSnapshot, DocumentStore, Entity, EntityManager, FieldMap, MemoryStore, SyncError,
};
use serde_json::json;

/// Test entity with one required field and one optional field, so merge and
/// replace writes are distinguishable.
#[derive(Debug, Clone, PartialEq)]
struct UserProfile {
    id: String,
    name: String,
    role: Option<String>,
}

impl UserProfile {
    fn named(name: &str) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            role: None,
        }
    }
}

impl Entity for UserProfile {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), json!(self.name));
        if let Some(role) = &self.role {
            fields.insert("role".to_string(), json!(role));
        }
        fields
    }

    fn from_snapshot(snapshot: &DocumentSnapshot) -> Option<Self> {
        let name = snapshot.get("name")?.as_str()?.to_string();
        let role = snapshot
            .get("role")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Some(Self {
            id: snapshot.id.clone(),
            name,
            role,
        })
    }
}

fn manager() -> EntityManager<MemoryStore> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    EntityManager::new(MemoryStore::new())
}

#[test]
fn test_field_map_round_trip() {
    let mut original = UserProfile::named("alice");
    original.id = "u1".to_string();
    original.role = Some("chef".to_string());

    let snapshot = DocumentSnapshot::new(UserProfile::COLLECTION, "u1", original.to_fields());
    let decoded = UserProfile::from_snapshot(&snapshot).expect("round-trips");
    assert_eq!(decoded, original);
}

#[tokio::test]
async fn test_fetch_missing_returns_none() {
    let manager = manager();
    let mut probe = UserProfile::named("whoever");
    probe.id = "missing".to_string();

    assert_eq!(manager.fetch(&probe).await, Ok(None));
}

#[tokio::test]
async fn test_create_then_fetch() {
    let manager = manager();

    let mut profile = UserProfile::named("alice");
    let id = manager.create(&profile).await.unwrap();
    assert!(!id.is_empty());
    profile.set_id(id);

    let fetched = manager.fetch(&profile).await.unwrap().unwrap();
    assert_eq!(fetched.name, "alice");
    assert_eq!(fetched.id, profile.id);
}

#[tokio::test]
async fn test_create_generates_distinct_ids() {
    let manager = manager();
    let a = manager.create(&UserProfile::named("a")).await.unwrap();
    let b = manager.create(&UserProfile::named("b")).await.unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_merge_put_preserves_unwritten_fields() {
    let manager = manager();

    let mut profile = UserProfile::named("alice");
    profile.id = "u1".to_string();
    profile.role = Some("chef".to_string());
    manager.put(&profile, false).await.unwrap();

    // Partial entity: role not in the written map.
    let mut partial = UserProfile::named("bob");
    partial.id = "u1".to_string();
    manager.put(&partial, true).await.unwrap();

    let fetched = manager.fetch(&partial).await.unwrap().unwrap();
    assert_eq!(fetched.name, "bob");
    assert_eq!(fetched.role.as_deref(), Some("chef"));
}

#[tokio::test]
async fn test_replace_put_drops_unwritten_fields() {
    let manager = manager();

    let mut profile = UserProfile::named("alice");
    profile.id = "u1".to_string();
    profile.role = Some("chef".to_string());
    manager.put(&profile, false).await.unwrap();

    let mut partial = UserProfile::named("bob");
    partial.id = "u1".to_string();
    manager.put(&partial, false).await.unwrap();

    let fetched = manager.fetch(&partial).await.unwrap().unwrap();
    assert_eq!(fetched.name, "bob");
    assert_eq!(fetched.role, None);
}

#[tokio::test]
async fn test_delete_missing_is_success() {
    let manager = manager();
    assert_eq!(manager.delete("users", "nobody").await, Ok(()));
}

#[tokio::test]
async fn test_delete_then_exists() {
    let manager = manager();

    let mut profile = UserProfile::named("alice");
    profile.id = "u1".to_string();
    manager.put(&profile, false).await.unwrap();
    assert!(manager.exists("users", "u1").await.unwrap());

    manager.delete("users", "u1").await.unwrap();
    assert!(!manager.exists("users", "u1").await.unwrap());

    // Deleting again is still a success.
    assert_eq!(manager.delete("users", "u1").await, Ok(()));
}

#[tokio::test]
async fn test_is_field_unique_tracks_creates() {
    let manager = manager();

    assert!(manager
        .is_field_unique("users", "name", &json!("alice"))
        .await
        .unwrap());

    manager.create(&UserProfile::named("alice")).await.unwrap();

    assert!(!manager
        .is_field_unique("users", "name", &json!("alice"))
        .await
        .unwrap());
    assert!(manager
        .is_field_unique("users", "name", &json!("bob"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_fetch_rejects_malformed_snapshot_as_none() {
    let manager = manager();

    // Written past the entity layer: no "name" field at all.
    let mut fields = FieldMap::new();
    fields.insert("nickname".to_string(), json!("al"));
    manager
        .store()
        .set("users", "u1", fields, false)
        .await
        .unwrap();

    let mut probe = UserProfile::named("whoever");
    probe.id = "u1".to_string();
    assert_eq!(manager.fetch(&probe).await, Ok(None));
}

#[tokio::test]
async fn test_dependent_array_via_manager() {
    let manager = manager();

    let mut fields = FieldMap::new();
    fields.insert(
        "kitchens".to_string(),
        json!([{"name": "north"}, {"name": "south"}]),
    );
    manager
        .store()
        .set("users", "u1", fields, false)
        .await
        .unwrap();

    let kitchens = manager.dependent_array("users", "u1", "kitchens").await.unwrap();
    assert_eq!(kitchens.len(), 2);
    assert_eq!(kitchens[0].get("name"), Some(&json!("north")));

    assert_eq!(
        manager.dependent_array("users", "u1", "absent").await,
        Ok(Vec::new())
    );
}

/// End-to-end scenario: create, fetch by the returned ID, merge-put a rename,
/// fetch again and see the rename plus every other field intact.
#[tokio::test]
async fn test_create_fetch_merge_scenario() {
    let manager = manager();

    let mut profile = UserProfile::named("a");
    profile.role = Some("chef".to_string());
    let id = manager.create(&profile).await.unwrap();
    profile.set_id(id);

    let fetched = manager.fetch(&profile).await.unwrap().unwrap();
    assert_eq!(fetched.name, "a");

    let mut renamed = UserProfile::named("b");
    renamed.id = profile.id.clone();
    manager.put(&renamed, true).await.unwrap();

    let fetched = manager.fetch(&profile).await.unwrap().unwrap();
    assert_eq!(fetched.name, "b");
    assert_eq!(fetched.role.as_deref(), Some("chef"));
}

#[tokio::test]
async fn test_shared_store_clones_see_each_other() {
    let store = MemoryStore::new();
    let writer = EntityManager::new(store.clone());
    let reader = EntityManager::new(store);

    let mut profile = UserProfile::named("alice");
    profile.id = "u1".to_string();
    writer.put(&profile, false).await.unwrap();

    assert!(reader.exists("users", "u1").await.unwrap());
}

#[tokio::test]
async fn test_transport_error_is_distinct_from_not_found() {
    // NotFound never comes out of fetch as an Err; absence is Ok(None).
    let manager = manager();
    let mut probe = UserProfile::named("whoever");
    probe.id = "missing".to_string();

    let result = manager.fetch(&probe).await;
    assert_eq!(result, Ok(None));
    assert!(!matches!(result, Err(SyncError::Transport(_))));
}
