//! In-memory index store.
//!
//! Keeps rows in a `BTreeMap` keyed by surrogate id behind a tokio `RwLock`, and
//! enforces the one-row-per-slot invariant like the unique index of the
//! PostgreSQL schema does. Slot lookups and entity deletes go through hash
//! indexes kept next to the rows. Counts every call so callers can observe
//! batching.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use entity_index_shared::{IndexEntry, NewIndexEntry};
use tokio::sync::RwLock;

use crate::errors::IndexStoreError;
use crate::interfaces::IndexStore;
use crate::types::MatchFilter;

/// Call counters of an [`InMemoryIndexStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub truncates: usize,
    pub bulk_inserts: usize,
    pub inserted_rows: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Rows returned by `find_matching`.
    pub matched_rows: usize,
}

/// `(model, field, foreign_id)`
type SlotKey = (String, String, String);
/// `(model, foreign_id)`
type EntityKey = (String, String);

fn slot_key(model: &str, field: &str, foreign_id: &str) -> SlotKey {
    (model.to_string(), field.to_string(), foreign_id.to_string())
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: BTreeMap<i64, IndexEntry>,
    slots: HashMap<SlotKey, i64>,
    entities: HashMap<EntityKey, Vec<i64>>,
    stats: StoreStats,
}

impl MemoryState {
    fn insert(&mut self, entry: &NewIndexEntry) {
        self.next_id += 1;
        let id = self.next_id;
        self.slots
            .insert(slot_key(&entry.model, &entry.field, &entry.foreign_id), id);
        self.entities
            .entry((entry.model.clone(), entry.foreign_id.clone()))
            .or_default()
            .push(id);
        self.rows.insert(id, entry.clone().with_id(id));
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.slots.clear();
        self.entities.clear();
    }
}

/// Index store holding all rows in process memory.
#[derive(Default)]
pub struct InMemoryIndexStore {
    state: RwLock<MemoryState>,
}

impl InMemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, ordered by id.
    pub async fn entries(&self) -> Vec<IndexEntry> {
        self.state.read().await.rows.values().cloned().collect()
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Returns true if the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }

    /// Call counters since creation.
    pub async fn stats(&self) -> StoreStats {
        self.state.read().await.stats
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn ensure_schema(&self) -> Result<(), IndexStoreError> {
        Ok(())
    }

    async fn truncate(&self) -> Result<(), IndexStoreError> {
        let mut state = self.state.write().await;
        state.clear();
        state.stats.truncates += 1;
        Ok(())
    }

    async fn bulk_insert(&self, entries: &[NewIndexEntry]) -> Result<u64, IndexStoreError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.write().await;
        // Validate the whole statement first so a conflict inserts nothing.
        let mut batch: HashSet<(&str, &str, &str)> = HashSet::with_capacity(entries.len());
        for entry in entries {
            let slot = (
                entry.model.as_str(),
                entry.field.as_str(),
                entry.foreign_id.as_str(),
            );
            if !batch.insert(slot)
                || state
                    .slots
                    .contains_key(&slot_key(&entry.model, &entry.field, &entry.foreign_id))
            {
                return Err(IndexStoreError::duplicate_slot(
                    &entry.model,
                    &entry.field,
                    &entry.foreign_id,
                ));
            }
        }
        for entry in entries {
            state.insert(entry);
        }
        state.stats.bulk_inserts += 1;
        state.stats.inserted_rows += entries.len();
        Ok(entries.len() as u64)
    }

    async fn find_existing(
        &self,
        model: &str,
        field: &str,
        foreign_id: &str,
    ) -> Result<Option<IndexEntry>, IndexStoreError> {
        let state = self.state.read().await;
        Ok(state
            .slots
            .get(&slot_key(model, field, foreign_id))
            .and_then(|id| state.rows.get(id))
            .cloned())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<(), IndexStoreError> {
        let mut state = self.state.write().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(IndexStoreError::NotFound(id))?;
        row.content = content.to_string();
        state.stats.updates += 1;
        Ok(())
    }

    async fn delete_entity(&self, foreign_id: &str, model: &str) -> Result<u64, IndexStoreError> {
        let mut state = self.state.write().await;
        let ids = state
            .entities
            .remove(&(model.to_string(), foreign_id.to_string()))
            .unwrap_or_default();
        for id in &ids {
            if let Some(row) = state.rows.remove(id) {
                state
                    .slots
                    .remove(&slot_key(&row.model, &row.field, &row.foreign_id));
            }
        }
        state.stats.deletes += 1;
        Ok(ids.len() as u64)
    }

    async fn find_matching(&self, filter: &MatchFilter) -> Result<Vec<IndexEntry>, IndexStoreError> {
        let mut state = self.state.write().await;
        let lower = filter.after_id.map_or(Bound::Unbounded, Bound::Excluded);
        let rows: Vec<IndexEntry> = state
            .rows
            .range((lower, Bound::Unbounded))
            .map(|(_, row)| row)
            .filter(|row| filter.matches(&row.model, &row.field, &row.content))
            .take(filter.max_rows.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        state.stats.matched_rows += rows.len();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(foreign_id: &str, model: &str, field: &str, content: &str) -> NewIndexEntry {
        NewIndexEntry::new(foreign_id, model, field, content)
    }

    #[tokio::test]
    async fn test_bulk_insert_assigns_ids() {
        let store = InMemoryIndexStore::new();
        let inserted = store
            .bulk_insert(&[
                entry("1", "Company", "company", "Mauricio SA"),
                entry("2", "Company", "company", "Acme AG"),
            ])
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        let rows = store.entries().await;
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
        assert_eq!(store.stats().await.bulk_inserts, 1);
    }

    #[tokio::test]
    async fn test_empty_bulk_insert_is_noop() {
        let store = InMemoryIndexStore::new();
        assert_eq!(store.bulk_insert(&[]).await.unwrap(), 0);
        assert_eq!(store.stats().await.bulk_inserts, 0);
    }

    #[tokio::test]
    async fn test_duplicate_slot_is_rejected() {
        let store = InMemoryIndexStore::new();
        store
            .bulk_insert(&[entry("1", "Company", "company", "Mauricio SA")])
            .await
            .unwrap();

        let result = store
            .bulk_insert(&[
                entry("2", "Company", "company", "Acme AG"),
                entry("1", "Company", "company", "Other"),
            ])
            .await;
        assert!(matches!(result, Err(IndexStoreError::DuplicateSlot { .. })));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_existing_and_update() {
        let store = InMemoryIndexStore::new();
        store
            .bulk_insert(&[entry("1", "Company", "company", "Mauricio SA")])
            .await
            .unwrap();

        let existing = store
            .find_existing("Company", "company", "1")
            .await
            .unwrap()
            .unwrap();
        store.update_content(existing.id, "Mauricio AG").await.unwrap();

        let updated = store
            .find_existing("Company", "company", "1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "Mauricio AG");
        assert!(store
            .find_existing("Company", "name", "1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = InMemoryIndexStore::new();
        let result = store.update_content(99, "x").await;
        assert!(matches!(result, Err(IndexStoreError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_delete_entity_only_touches_model() {
        let store = InMemoryIndexStore::new();
        store
            .bulk_insert(&[
                entry("1", "Contact", "contact", "Jane"),
                entry("1", "Contact", "email", "jane@example.com"),
                entry("1", "Person", "person", "Jane"),
                entry("2", "Contact", "contact", "John"),
            ])
            .await
            .unwrap();

        let deleted = store.delete_entity("1", "Contact").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_truncate_and_match() {
        let store = InMemoryIndexStore::new();
        store
            .bulk_insert(&[
                entry("1", "Company", "company", "Mauricio SA"),
                entry("2", "Contact", "contact", "Mauro Rossi"),
            ])
            .await
            .unwrap();

        let all = store.find_matching(&MatchFilter::new("MAUR")).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = store
            .find_matching(&MatchFilter::new("maur").with_fields(vec!["contact".to_string()]))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].model, "Contact");

        store.truncate().await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.stats().await.truncates, 1);
    }

    #[tokio::test]
    async fn test_slot_index_follows_deletes_and_truncate() {
        let store = InMemoryIndexStore::new();
        store
            .bulk_insert(&[
                entry("1", "Contact", "contact", "Jane"),
                entry("1", "Person", "person", "Jane"),
            ])
            .await
            .unwrap();

        store.delete_entity("1", "Contact").await.unwrap();
        assert!(store
            .find_existing("Contact", "contact", "1")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_existing("Person", "person", "1")
            .await
            .unwrap()
            .is_some());
        assert_eq!(store.delete_entity("1", "Contact").await.unwrap(), 0);

        // A freed slot can be written again.
        store
            .bulk_insert(&[entry("1", "Contact", "contact", "Jane Doe")])
            .await
            .unwrap();
        store.truncate().await.unwrap();
        store
            .bulk_insert(&[entry("1", "Person", "person", "Jane")])
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_large_batched_load_keeps_slot_lookups() {
        let store = InMemoryIndexStore::new();
        let entries: Vec<NewIndexEntry> = (0..50_000)
            .map(|i| entry(&i.to_string(), "Company", "company", &format!("Company {i}")))
            .collect();
        for chunk in entries.chunks(200) {
            store.bulk_insert(chunk).await.unwrap();
        }

        assert_eq!(store.len().await, 50_000);
        assert_eq!(store.stats().await.bulk_inserts, 250);
        let row = store
            .find_existing("Company", "company", "49999")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.content, "Company 49999");
    }

    #[tokio::test]
    async fn test_find_matching_pages_by_id() {
        let store = InMemoryIndexStore::new();
        let entries: Vec<NewIndexEntry> = (1..=10)
            .map(|i| entry(&i.to_string(), "Company", "company", &format!("Company {i}")))
            .collect();
        store.bulk_insert(&entries).await.unwrap();

        let first = store
            .find_matching(&MatchFilter::new("company").with_max_rows(4))
            .await
            .unwrap();
        assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let next = store
            .find_matching(&MatchFilter::new("company").with_max_rows(4).after(4))
            .await
            .unwrap();
        assert_eq!(next.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 6, 7, 8]);
        assert_eq!(store.stats().await.matched_rows, 8);
    }
}
