//! Error types for the entity index engine.

use entity_index_repository::IndexStoreError;
use thiserror::Error;

use crate::source::SourceError;

/// Errors raised by metadata lookups, content building, population and search.
///
/// `Configuration`, `TypeNotMapped`, `TypeNotIndexed` and `AccessorNotFound`
/// point at programming or configuration defects and are never worth retrying.
/// Store and source failures are passed through unchanged.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Malformed index metadata (missing accessor, unknown formatter, bad hierarchy).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The type is unknown to the persistence layer.
    #[error("Type is not mapped: {0}")]
    TypeNotMapped(String),

    /// The type is mapped but declares no indexed fields.
    #[error("Type is not indexed: {0}")]
    TypeNotIndexed(String),

    /// An id or field accessor could not be applied at call time.
    #[error("Accessor '{accessor}' not found on type {type_name}")]
    AccessorNotFound { type_name: String, accessor: String },

    /// Invalid request parameters.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error from the index store.
    #[error("Index store error: {0}")]
    Store(#[from] IndexStoreError),

    /// Error from the entity source.
    #[error("Entity source error: {0}")]
    Source(#[from] SourceError),
}

impl IndexError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a type-not-mapped error.
    pub fn type_not_mapped(type_name: impl Into<String>) -> Self {
        Self::TypeNotMapped(type_name.into())
    }

    /// Create a type-not-indexed error.
    pub fn type_not_indexed(type_name: impl Into<String>) -> Self {
        Self::TypeNotIndexed(type_name.into())
    }

    /// Create an accessor-not-found error.
    pub fn accessor_not_found(type_name: impl Into<String>, accessor: impl Into<String>) -> Self {
        Self::AccessorNotFound {
            type_name: type_name.into(),
            accessor: accessor.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns true for errors caused by an invalid type argument.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeNotMapped(_) | Self::TypeNotIndexed(_))
    }
}
