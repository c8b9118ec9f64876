//! Index store trait definition.
//!
//! This module defines the abstract interface over the denormalized index
//! table `(id, foreign_id, model, field, content)`.

use async_trait::async_trait;
use entity_index_shared::{IndexEntry, NewIndexEntry};

use crate::errors::IndexStoreError;
use crate::types::MatchFilter;

/// Abstracts the storage of index rows (PostgreSQL, in-memory, ...).
///
/// Implementations are shared behind `Arc<dyn IndexStore>` by the population
/// engine and the search layer. Mutating operations run inside whatever
/// transaction the implementation establishes per call; callers manage no
/// transaction boundaries.
///
/// # Concurrency
///
/// [`truncate`](IndexStore::truncate) followed by a rebuild is not safe against
/// concurrent writers. Callers must serialize full rebuilds externally and must
/// not run incremental writes during one.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Ensure the index table and its indexes exist, creating them if necessary.
    ///
    /// Call once during application startup.
    async fn ensure_schema(&self) -> Result<(), IndexStoreError>;

    /// Remove every row of the index table.
    async fn truncate(&self) -> Result<(), IndexStoreError>;

    /// Insert rows in bulk.
    ///
    /// Accepts any number of rows; an empty slice is a no-op.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of rows inserted
    /// * `Err(IndexStoreError)` - If any statement fails; earlier chunks stay written
    async fn bulk_insert(&self, entries: &[NewIndexEntry]) -> Result<u64, IndexStoreError>;

    /// Look up the row of a slot.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(IndexEntry))` - The existing row
    /// * `Ok(None)` - If the slot is empty
    async fn find_existing(
        &self,
        model: &str,
        field: &str,
        foreign_id: &str,
    ) -> Result<Option<IndexEntry>, IndexStoreError>;

    /// Replace the content of the row with the given id.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the row was updated
    /// * `Err(IndexStoreError::NotFound)` - If no row has that id
    async fn update_content(&self, id: i64, content: &str) -> Result<(), IndexStoreError>;

    /// Delete every row of one entity under one model.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of rows deleted (zero if there were none)
    async fn delete_entity(&self, foreign_id: &str, model: &str) -> Result<u64, IndexStoreError>;

    /// Return the rows passing the filter, ordered by id.
    ///
    /// Honors the filter's `after_id` and `max_rows` page bounds.
    async fn find_matching(&self, filter: &MatchFilter) -> Result<Vec<IndexEntry>, IndexStoreError>;
}
