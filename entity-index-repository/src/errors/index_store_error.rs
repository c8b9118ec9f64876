//! Index store error types.
//!
//! Store failures are surfaced unchanged to callers; nothing in this crate
//! retries an operation.

use thiserror::Error;

/// Unified errors from index store operations.
#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// Error reported by the database driver (connection loss, constraint violation, ...).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to apply the schema migrations.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row addressed by id does not exist.
    #[error("Index entry not found: id={0}")]
    NotFound(i64),

    /// A write would create a second row for an existing slot.
    #[error("Duplicate index slot: model={model}, field={field}, foreign_id={foreign_id}")]
    DuplicateSlot {
        model: String,
        field: String,
        foreign_id: String,
    },

    /// Validation error (e.g., invalid request parameters).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl IndexStoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a duplicate slot error.
    pub fn duplicate_slot(model: &str, field: &str, foreign_id: &str) -> Self {
        Self::DuplicateSlot {
            model: model.to_string(),
            field: field.to_string(),
            foreign_id: foreign_id.to_string(),
        }
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
