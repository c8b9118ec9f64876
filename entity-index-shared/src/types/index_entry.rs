//! Index row types.
//!
//! This module defines the rows stored in the denormalized index table. One row
//! holds the searchable text of one field (or one group of fields) of one
//! entity instance, seen as one type of its ancestor chain.

use serde::{Deserialize, Serialize};

/// A persisted row of the index table.
///
/// The triple `(foreign_id, model, field)` identifies a logical index slot: at most
/// one row exists per slot, and a second write to it is an update.
///
/// # Fields
///
/// - `id`: Surrogate key assigned by the store on insert
/// - `foreign_id`: String form of the source entity's natural identifier
/// - `model`: Type name that declares the indexing for this row
/// - `field`: Field name or group name this row represents
/// - `content`: Concatenated, formatted, searchable text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: i64,
    pub foreign_id: String,
    pub model: String,
    pub field: String,
    pub content: String,
}

impl IndexEntry {
    /// Returns true if the row belongs to the given slot.
    pub fn is_slot(&self, model: &str, field: &str, foreign_id: &str) -> bool {
        self.model == model && self.field == field && self.foreign_id == foreign_id
    }
}

/// A row waiting to be inserted; the store assigns its `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewIndexEntry {
    pub foreign_id: String,
    pub model: String,
    pub field: String,
    pub content: String,
}

impl NewIndexEntry {
    /// Create a new row candidate.
    ///
    /// # Example
    ///
    /// ```
    /// use entity_index_shared::NewIndexEntry;
    ///
    /// let entry = NewIndexEntry::new("42", "Company", "company", "Mauricio SA Zurich");
    /// assert_eq!(entry.model, "Company");
    /// ```
    pub fn new(
        foreign_id: impl Into<String>,
        model: impl Into<String>,
        field: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            foreign_id: foreign_id.into(),
            model: model.into(),
            field: field.into(),
            content: content.into(),
        }
    }

    /// Returns true if the content has no searchable text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Attach a surrogate id, producing the persisted row.
    pub fn with_id(self, id: i64) -> IndexEntry {
        IndexEntry {
            id,
            foreign_id: self.foreign_id,
            model: self.model,
            field: self.field,
            content: self.content,
        }
    }
}
