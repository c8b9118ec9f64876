//! Loader module for the entity index.
//!
//! Buffers new index rows and writes them to the index store in bulk.

use std::sync::Arc;

use entity_index_repository::IndexStore;
use entity_index_shared::NewIndexEntry;
use tracing::{debug, error, instrument};

use crate::errors::IndexError;

/// Write buffer in front of an [`IndexStore`].
///
/// The loader never flushes on its own; the populator decides the cadence.
/// Rows still pending when the loader is dropped are lost.
pub struct IndexLoader {
    store: Arc<dyn IndexStore>,
    pending: Vec<NewIndexEntry>,
    batches: usize,
    rows_written: u64,
}

impl IndexLoader {
    /// Create a loader with room for `capacity` pending rows.
    pub fn new(store: Arc<dyn IndexStore>, capacity: usize) -> Self {
        Self {
            store,
            pending: Vec::with_capacity(capacity),
            batches: 0,
            rows_written: 0,
        }
    }

    /// Queue one row.
    pub fn push(&mut self, entry: NewIndexEntry) {
        self.pending.push(entry);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of bulk inserts issued so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write every pending row with one bulk insert. A no-op when nothing is pending.
    #[instrument(skip(self), fields(pending = self.pending.len()))]
    pub async fn flush(&mut self) -> Result<(), IndexError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let entries: Vec<NewIndexEntry> = self.pending.drain(..).collect();
        let count = entries.len();

        debug!(count = count, "Flushing rows to index store");

        match self.store.bulk_insert(&entries).await {
            Ok(inserted) => {
                self.batches += 1;
                self.rows_written += inserted;
                debug!(inserted = inserted, "Bulk insert completed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, count = count, "Failed to bulk insert rows");
                Err(e.into())
            }
        }
    }
}
