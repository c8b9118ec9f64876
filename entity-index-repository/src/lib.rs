//! # Entity Index Repository
//!
//! This crate provides the `IndexStore` trait for the denormalized index table,
//! its error type, and two implementations: PostgreSQL (through sqlx) and an
//! in-memory store for embedding and tests.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;
pub mod types;
pub mod utils;

pub use config::IndexStoreConfig;
pub use errors::IndexStoreError;
pub use interfaces::IndexStore;
pub use memory::{InMemoryIndexStore, StoreStats};
pub use postgres::PostgresIndexStore;
pub use types::MatchFilter;
pub use utils::like_pattern;
