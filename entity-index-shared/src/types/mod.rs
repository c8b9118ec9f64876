//! Core data structures used across the entity index.
//! Re-exports the index row types and the search types.

pub mod index_entry;
pub mod search_hit;
pub mod search_query;

pub use index_entry::{IndexEntry, NewIndexEntry};
pub use search_hit::SearchHit;
pub use search_query::SearchQuery;
