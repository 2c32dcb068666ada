//! In-memory descriptor registry, the daemon's one shared mutable resource.
//!
//! The map lives behind a single lock as a swappable `Arc` snapshot:
//! readers clone the `Arc` and scan it lock-free, reload replaces the
//! whole thing, and mutations copy-modify-swap. Nobody ever observes a
//! partially rebuilt map.

use presence_core::Descriptor;
use presence_store::records::EmployeeDoc;
use presence_store::{IdentityStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown employee: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Immutable view of the registry at one instant.
pub type Snapshot = Arc<HashMap<String, Descriptor>>;

pub struct Registry {
    store: Arc<dyn IdentityStore>,
    /// Page cap for [`Registry::reload`]. A memory bound on the cache, not
    /// a correctness guarantee.
    reload_limit: usize,
    faces: RwLock<Snapshot>,
}

impl Registry {
    pub fn new(store: Arc<dyn IdentityStore>, reload_limit: usize) -> Self {
        Self {
            store,
            reload_limit,
            faces: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Rebuild the cache wholesale from the store.
    ///
    /// On store failure the previous snapshot stays in place: stale data
    /// keeps the service answering, an empty map would not.
    pub async fn reload(&self) -> Result<usize, RegistryError> {
        let docs = self.store.load_employees(self.reload_limit).await?;
        let map: HashMap<String, Descriptor> = docs
            .into_iter()
            .map(|doc| (doc.name, doc.descriptor))
            .collect();
        let count = map.len();
        *self.faces.write().await = Arc::new(map);
        tracing::info!(count, "descriptor registry reloaded");
        Ok(count)
    }

    /// Insert or overwrite one identity, write-through: the store write
    /// happens first, and only its success makes the descriptor visible in
    /// memory. A cache-only entry must never exist.
    pub async fn put(&self, name: &str, descriptor: Descriptor) -> Result<(), RegistryError> {
        let doc = EmployeeDoc::new(name, descriptor.clone());
        self.store.put_employee(&doc).await?;

        let mut guard = self.faces.write().await;
        let mut next = (**guard).clone();
        next.insert(name.to_string(), descriptor);
        *guard = Arc::new(next);
        tracing::info!(name, "identity enrolled");
        Ok(())
    }

    /// Remove one identity from the store, then from memory. An unknown
    /// name fails with `NotFound` and has no side effects.
    pub async fn remove(&self, name: &str) -> Result<(), RegistryError> {
        if !self.faces.read().await.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let existed = self.store.delete_employee(name).await?;
        if !existed {
            tracing::debug!(name, "cached identity was already absent from the store");
        }

        let mut guard = self.faces.write().await;
        let mut next = (**guard).clone();
        next.remove(name);
        *guard = Arc::new(next);
        tracing::info!(name, "identity removed");
        Ok(())
    }

    /// Current snapshot for lock-free scanning.
    pub async fn snapshot(&self) -> Snapshot {
        self.faces.read().await.clone()
    }

    /// Enrolled names in sorted order.
    pub async fn list(&self) -> Vec<String> {
        let snapshot = self.snapshot().await;
        let mut names: Vec<String> = snapshot.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.faces.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockStore;
    use presence_core::{best_match, MatchOutcome, MatchPolicy, ScoreKind};

    fn descriptor(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[tokio::test]
    async fn test_reload_replaces_whole_map() {
        let store = MockStore::new();
        store.seed_employee("alice", descriptor(&[1.0]));
        store.seed_employee("bob", descriptor(&[2.0]));

        let registry = Registry::new(store.clone(), 100);
        assert_eq!(registry.reload().await.unwrap(), 2);
        assert_eq!(registry.list().await, ["alice", "bob"]);

        store.clear_employees();
        store.seed_employee("carol", descriptor(&[3.0]));
        assert_eq!(registry.reload().await.unwrap(), 1);
        assert_eq!(registry.list().await, ["carol"]);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_snapshot() {
        let store = MockStore::new();
        store.seed_employee("alice", descriptor(&[1.0]));

        let registry = Registry::new(store.clone(), 100);
        registry.reload().await.unwrap();

        store.set_failing(true);
        assert!(matches!(
            registry.reload().await,
            Err(RegistryError::Store(_))
        ));
        // Stale beats empty.
        assert_eq!(registry.list().await, ["alice"]);
    }

    #[tokio::test]
    async fn test_put_is_write_through() {
        let store = MockStore::new();
        let registry = Registry::new(store.clone(), 100);

        registry.put("alice", descriptor(&[1.0])).await.unwrap();
        assert_eq!(registry.len().await, 1);
        assert_eq!(store.employee_names(), ["alice"]);
    }

    #[tokio::test]
    async fn test_put_store_failure_leaves_memory_unchanged() {
        let store = MockStore::new();
        let registry = Registry::new(store.clone(), 100);

        store.set_failing(true);
        assert!(registry.put("alice", descriptor(&[1.0])).await.is_err());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_name() {
        let store = MockStore::new();
        let registry = Registry::new(store.clone(), 100);

        registry.put("alice", descriptor(&[1.0])).await.unwrap();
        registry.put("alice", descriptor(&[9.0])).await.unwrap();

        assert_eq!(registry.len().await, 1);
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot["alice"], descriptor(&[9.0]));
    }

    #[tokio::test]
    async fn test_remove_unknown_name_has_no_side_effects() {
        let store = MockStore::new();
        let registry = Registry::new(store.clone(), 100);
        registry.put("alice", descriptor(&[1.0])).await.unwrap();

        assert!(matches!(
            registry.remove("nobody").await,
            Err(RegistryError::NotFound(_))
        ));
        assert_eq!(registry.len().await, 1);
        assert_eq!(store.employee_names(), ["alice"]);
    }

    #[tokio::test]
    async fn test_remove_deletes_from_store_and_memory() {
        let store = MockStore::new();
        let registry = Registry::new(store.clone(), 100);
        registry.put("alice", descriptor(&[1.0])).await.unwrap();
        registry.put("bob", descriptor(&[2.0])).await.unwrap();

        registry.remove("alice").await.unwrap();
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.list().await, ["bob"]);
        assert_eq!(store.employee_names(), ["bob"]);
    }

    #[tokio::test]
    async fn test_enroll_then_match_reads_own_write() {
        let store = MockStore::new();
        let registry = Registry::new(store, 100);

        let d = descriptor(&[0.5, 0.5, 0.0]);
        registry.put("alice", d.clone()).await.unwrap();

        let snapshot = registry.snapshot().await;
        let outcome = best_match(
            &d,
            snapshot.iter().map(|(k, v)| (k.as_str(), v)),
            MatchPolicy {
                kind: ScoreKind::LowerIsBetter,
                threshold: 0.6,
            },
        );
        match outcome {
            MatchOutcome::Match { name, score } => {
                assert_eq!(name, "alice");
                assert!(score.abs() < 1e-6);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }
}
