//! PostgreSQL implementation of the index store.

mod store;

pub use store::PostgresIndexStore;
