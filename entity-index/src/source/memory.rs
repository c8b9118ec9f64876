use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::metadata::IndexMetadata;
use crate::source::{Entity, EntitySource, EntityStream, PopulateQuery, SourceError};

/// Entity source holding its entities in memory.
///
/// Every type declared in the metadata is mapped. Entities are added with
/// [`InMemoryEntitySource::insert`] before the source is shared.
pub struct InMemoryEntitySource {
    metadata: Arc<IndexMetadata>,
    entities: HashMap<String, Vec<Arc<dyn Entity>>>,
    queries: HashMap<String, Arc<dyn PopulateQuery>>,
    detaches: AtomicU64,
}

impl InMemoryEntitySource {
    pub fn new(metadata: Arc<IndexMetadata>) -> Self {
        Self {
            metadata,
            entities: HashMap::new(),
            queries: HashMap::new(),
            detaches: AtomicU64::new(0),
        }
    }

    /// Add a persisted entity.
    ///
    /// # Returns
    ///
    /// * `Err(SourceError::UnknownType)` - If the entity's Rust type is not declared
    pub fn insert<T: Entity>(&mut self, entity: T) -> Result<(), SourceError> {
        let entity: Arc<dyn Entity> = Arc::new(entity);
        let type_name = self
            .metadata
            .type_name_of(&*entity)
            .ok_or_else(|| SourceError::UnknownType(std::any::type_name::<T>().to_string()))?
            .to_string();
        self.entities.entry(type_name).or_default().push(entity);
        Ok(())
    }

    /// Register a custom population query for a type.
    pub fn with_populate_query(mut self, type_name: &str, query: Arc<dyn PopulateQuery>) -> Self {
        self.queries.insert(type_name.to_string(), query);
        self
    }

    /// Number of `detach_all` calls so far.
    pub fn detach_count(&self) -> u64 {
        self.detaches.load(Ordering::Relaxed)
    }

    fn instances(&self, type_name: &str) -> Vec<Arc<dyn Entity>> {
        self.entities.get(type_name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl EntitySource for InMemoryEntitySource {
    fn is_mapped(&self, type_name: &str) -> bool {
        self.metadata.is_mapped(type_name)
    }

    async fn count_of(&self, type_name: &str) -> Result<u64, SourceError> {
        if !self.is_mapped(type_name) {
            return Err(SourceError::UnknownType(type_name.to_string()));
        }
        Ok(self.entities.get(type_name).map_or(0, |e| e.len() as u64))
    }

    fn stream_all<'a>(&'a self, type_name: &'a str) -> EntityStream<'a> {
        if !self.is_mapped(type_name) {
            warn!(type_name, "Streaming unmapped type");
            return stream::once(async move { Err(SourceError::UnknownType(type_name.to_string())) })
                .boxed();
        }
        stream::iter(self.instances(type_name).into_iter().map(Ok)).boxed()
    }

    fn populate_query(&self, type_name: &str) -> Option<Arc<dyn PopulateQuery>> {
        self.queries.get(type_name).cloned()
    }

    async fn detach_all(&self) -> Result<(), SourceError> {
        let count = self.detaches.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(detach_count = count, "Detached loaded entities");
        Ok(())
    }
}
