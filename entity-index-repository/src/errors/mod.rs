//! Error types for the entity index repository.
//!
//! This module provides a unified error type for all index store operations.

mod index_store_error;

pub use index_store_error::IndexStoreError;
