//! # Entity Index Shared
//!
//! This crate defines the data structures shared across the entity index crates:
//! the rows of the denormalized index table and the search request/response types.

pub mod types;

pub use types::index_entry::{IndexEntry, NewIndexEntry};
pub use types::search_hit::SearchHit;
pub use types::search_query::SearchQuery;
