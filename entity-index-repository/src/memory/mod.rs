//! In-memory implementation of the index store.

mod store;

pub use store::{InMemoryIndexStore, StoreStats};
