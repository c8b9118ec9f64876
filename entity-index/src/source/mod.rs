//! Entity source abstraction.
//!
//! The persistence layer the engine reads entities from. It knows which types
//! are mapped, streams all persisted instances of a type in batches, and can
//! release the objects it keeps track of after each batch.

mod memory;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub use memory::InMemoryEntitySource;

/// A persisted domain object.
///
/// Implemented for every `'static` thread-safe type. Engine code receives
/// entities as `&dyn Entity` and resolves their concrete type through
/// [`Entity::as_any`].
pub trait Entity: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> Entity for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Errors raised by an entity source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Entity source unavailable: {0}")]
    Unavailable(String),

    #[error("Entity query failed: {0}")]
    Query(String),

    #[error("Unknown entity type: {0}")]
    UnknownType(String),
}

pub type EntityStream<'a> = BoxStream<'a, Result<Arc<dyn Entity>, SourceError>>;

/// A custom population query supplied for one type.
///
/// Replaces the source's default "all instances" query during a full reindex,
/// for example to restrict or eagerly load the population set.
#[async_trait]
pub trait PopulateQuery: Send + Sync {
    /// Number of entities `stream` yields.
    async fn count(&self) -> Result<u64, SourceError>;

    /// Stream the entities to index.
    fn stream(&self) -> EntityStream<'_>;
}

/// Read access to persisted entities.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Returns true if the persistence layer knows the type.
    fn is_mapped(&self, type_name: &str) -> bool;

    /// Number of persisted instances of exactly this type.
    async fn count_of(&self, type_name: &str) -> Result<u64, SourceError>;

    /// Stream every persisted instance of exactly this type.
    fn stream_all<'a>(&'a self, type_name: &'a str) -> EntityStream<'a>;

    /// Custom population query for the type, if one is registered.
    fn populate_query(&self, _type_name: &str) -> Option<Arc<dyn PopulateQuery>> {
        None
    }

    /// Release every entity loaded so far. Called after each flushed batch to
    /// bound memory during a full reindex.
    async fn detach_all(&self) -> Result<(), SourceError>;
}
