//! Interface definitions for the index store.
//!
//! This module defines the abstract `IndexStore` trait that allows for
//! dependency injection and swappable storage implementations.

mod index_store;

pub use index_store::IndexStore;
