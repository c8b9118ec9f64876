//! Per-unit-of-work dedup sets.

use std::collections::HashSet;

use tokio::sync::Mutex;

/// Identity of an entity instance: its registered type and natural identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub type_name: String,
    pub foreign_id: String,
}

impl EntityKey {
    pub fn new(type_name: impl Into<String>, foreign_id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            foreign_id: foreign_id.into(),
        }
    }
}

/// Entities already handled in the current unit of work.
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: Mutex<HashSet<EntityKey>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as visited. Returns false if it already was.
    pub async fn insert(&self, key: EntityKey) -> bool {
        self.keys.lock().await.insert(key)
    }

    /// Forget one entity, so it is handled again in this unit of work.
    pub async fn remove(&self, key: &EntityKey) -> bool {
        self.keys.lock().await.remove(key)
    }

    pub async fn contains(&self, key: &EntityKey) -> bool {
        self.keys.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }

    /// Forget every visited entity.
    pub async fn clear(&self) {
        self.keys.lock().await.clear();
    }
}
