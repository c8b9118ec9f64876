//! Index population engine.
//!
//! Runs the full reindex ([`Populator::populate`]) and the incremental,
//! per-entity paths ([`Populator::index`] and [`Populator::remove`]).
//!
//! # Concurrency
//!
//! A full reindex truncates the index table and rebuilds it. It needs exclusive
//! write access: running two full reindexes at once, or incremental indexing
//! during one, leaves the table in an unspecified state. Callers serialize these
//! externally; [`crate::listener::EntityListener::populate`] turns incremental
//! indexing off for the duration of a run.
//!
//! A failure halfway through a batch is not rolled back. Rerun the full reindex
//! to recover.

mod visited;

use std::str::FromStr;
use std::sync::Arc;

use entity_index_repository::IndexStore;
use entity_index_shared::{IndexEntry, NewIndexEntry};
use futures::TryStreamExt;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::errors::IndexError;
use crate::formatter::FormatterRegistry;
use crate::loader::IndexLoader;
use crate::metadata::IndexMetadata;
use crate::output::ProgressSink;
use crate::processor::{ContentBuilder, KeyMode};
use crate::source::{Entity, EntitySource};

pub use visited::{EntityKey, VisitedSet};

/// Default number of entities per flushed batch.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// What the incremental path does with a slot whose content renders blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyContentPolicy {
    /// Leave the slot untouched.
    Skip,
    /// Write the blank content, clearing stale text.
    #[default]
    Write,
}

impl FromStr for EmptyContentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "write" => Ok(Self::Write),
            other => Err(format!("invalid empty content policy '{other}'")),
        }
    }
}

/// Configuration for the populator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulatorConfig {
    /// Number of entities processed between flushes during a full reindex.
    pub batch_size: usize,
    pub key_mode: KeyMode,
    pub empty_content: EmptyContentPolicy,
}

impl Default for PopulatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            key_mode: KeyMode::default(),
            empty_content: EmptyContentPolicy::default(),
        }
    }
}

/// Counts of one full reindex run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulateSummary {
    pub types_indexed: usize,
    pub types_skipped: usize,
    pub entities_processed: u64,
    pub rows_written: u64,
    pub batches: usize,
}

/// Result of one incremental call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Not indexed, an index row itself, or already handled in this unit of work.
    Skipped,
    Indexed { inserted: u64, updated: u64 },
    Removed { deleted: u64 },
}

/// Keeps the index table in sync with the entities of an [`EntitySource`].
pub struct Populator {
    store: Arc<dyn IndexStore>,
    source: Arc<dyn EntitySource>,
    metadata: Arc<IndexMetadata>,
    builder: ContentBuilder,
    config: PopulatorConfig,
    visited_index: VisitedSet,
    visited_remove: VisitedSet,
}

impl Populator {
    /// Create a populator and compile the content plans of every indexed type.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::Configuration)` - If a field names an unknown formatter
    ///   or the batch size is zero
    pub fn new(
        store: Arc<dyn IndexStore>,
        source: Arc<dyn EntitySource>,
        metadata: Arc<IndexMetadata>,
        formatters: &FormatterRegistry,
        config: PopulatorConfig,
    ) -> Result<Self, IndexError> {
        if config.batch_size == 0 {
            return Err(IndexError::configuration("batch size must be greater than zero"));
        }
        let builder = ContentBuilder::compile(&metadata, formatters, config.key_mode)?;

        Ok(Self {
            store,
            source,
            metadata,
            builder,
            config,
            visited_index: VisitedSet::new(),
            visited_remove: VisitedSet::new(),
        })
    }

    pub fn config(&self) -> &PopulatorConfig {
        &self.config
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Rebuild the index table from scratch.
    ///
    /// With a `scope`, only that type and its subtypes are rebuilt, but the whole
    /// table is still truncated first. The scope is checked before anything is
    /// deleted.
    ///
    /// Every concrete type is streamed from the source. Each instance gets one row
    /// per non-blank key for its own type and for each indexed ancestor. Every
    /// `batch_size` instances the pending rows are flushed and the source releases
    /// its loaded entities.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::TypeNotMapped)` - If the scope is unknown to the source
    /// * `Err(IndexError::TypeNotIndexed)` - If the scope has no index configuration
    #[instrument(skip(self, output))]
    pub async fn populate(
        &self,
        output: &dyn ProgressSink,
        scope: Option<&str>,
    ) -> Result<PopulateSummary, IndexError> {
        let scoped_types = match scope {
            Some(type_name) => {
                if !self.source.is_mapped(type_name) {
                    return Err(IndexError::type_not_mapped(type_name));
                }
                if !self.metadata.is_indexed(type_name) {
                    return Err(IndexError::type_not_indexed(type_name));
                }
                Some(self.metadata.subtypes_of(type_name))
            }
            None => None,
        };

        output.log("Flushing index table");
        self.store.truncate().await?;

        let mut loader = IndexLoader::new(self.store.clone(), self.config.batch_size);
        let mut summary = PopulateSummary::default();

        for type_name in self.metadata.indexed_type_names() {
            if scoped_types
                .as_ref()
                .is_some_and(|types| !types.contains(&type_name))
            {
                continue;
            }
            if self.metadata.is_abstract(type_name) {
                debug!(type_name, "Skipping abstract type");
                summary.types_skipped += 1;
                continue;
            }

            output.log(&format!("Indexing {type_name}"));
            summary.entities_processed += self.populate_type(output, type_name, &mut loader).await?;
            summary.types_indexed += 1;
        }

        summary.rows_written = loader.rows_written();
        summary.batches = loader.batches();

        info!(
            types_indexed = summary.types_indexed,
            entities_processed = summary.entities_processed,
            rows_written = summary.rows_written,
            batches = summary.batches,
            "Index population completed"
        );
        Ok(summary)
    }

    async fn populate_type(
        &self,
        output: &dyn ProgressSink,
        type_name: &str,
        loader: &mut IndexLoader,
    ) -> Result<u64, IndexError> {
        let custom_query = self.source.populate_query(type_name);
        let (count, mut entities) = match &custom_query {
            Some(query) => (query.count().await?, query.stream()),
            None => (
                self.source.count_of(type_name).await?,
                self.source.stream_all(type_name),
            ),
        };

        output.progress_start(count);

        let id_accessor = self.metadata.id_accessor(type_name)?;
        let models: Vec<&str> = self.metadata.indexed_ancestors(type_name).collect();
        let batch_size = self.config.batch_size as u64;
        let mut processed: u64 = 0;

        while let Some(entity) = entities.try_next().await? {
            let entity: &dyn Entity = &*entity;
            let foreign_id = id_accessor.read(entity)?;

            for model in &models {
                for keyed in self.builder.build(type_name, model, entity)? {
                    if keyed.is_blank() {
                        continue;
                    }
                    loader.push(NewIndexEntry::new(&foreign_id, *model, keyed.key, keyed.content));
                }
            }

            processed += 1;
            if processed % batch_size == 0 {
                loader.flush().await?;
                output.set_progress(processed);
                self.source.detach_all().await?;
            }
        }

        loader.flush().await?;
        self.source.detach_all().await?;
        output.progress_finish();

        debug!(type_name, processed, expected = count, "Type populated");
        Ok(processed)
    }

    /// Index one created or updated entity.
    ///
    /// Each slot of the entity's type and of its indexed ancestors is updated in
    /// place when a row exists and inserted otherwise. An entity is indexed at
    /// most once per unit of work. A failed write leaves it unvisited, so it can
    /// be indexed again.
    #[instrument(skip(self, entity))]
    pub async fn index(&self, entity: &dyn Entity) -> Result<IndexOutcome, IndexError> {
        let Some((type_name, foreign_id)) = self.resolve(entity)? else {
            return Ok(IndexOutcome::Skipped);
        };
        let key = EntityKey::new(type_name, foreign_id.as_str());
        if !self.visited_index.insert(key.clone()).await {
            debug!(type_name, foreign_id = %foreign_id, "Already indexed in this unit of work");
            return Ok(IndexOutcome::Skipped);
        }

        match self.write_slots(type_name, &foreign_id, entity).await {
            Ok((inserted, updated)) => {
                debug!(type_name, foreign_id = %foreign_id, inserted, updated, "Entity indexed");
                Ok(IndexOutcome::Indexed { inserted, updated })
            }
            Err(e) => {
                self.visited_index.remove(&key).await;
                Err(e)
            }
        }
    }

    async fn write_slots(
        &self,
        type_name: &str,
        foreign_id: &str,
        entity: &dyn Entity,
    ) -> Result<(u64, u64), IndexError> {
        let mut inserted = 0;
        let mut updated = 0;
        for model in self.metadata.indexed_ancestors(type_name) {
            for keyed in self.builder.build(type_name, model, entity)? {
                if keyed.is_blank() && self.config.empty_content == EmptyContentPolicy::Skip {
                    continue;
                }
                match self.store.find_existing(model, &keyed.key, foreign_id).await? {
                    Some(existing) => {
                        self.store.update_content(existing.id, &keyed.content).await?;
                        updated += 1;
                    }
                    None => {
                        let entry = NewIndexEntry::new(foreign_id, model, keyed.key, keyed.content);
                        inserted += self.store.bulk_insert(&[entry]).await?;
                    }
                }
            }
        }
        Ok((inserted, updated))
    }

    /// Delete every row of one removed entity, across its indexed ancestors.
    ///
    /// A failed delete leaves the entity unvisited, like [`Populator::index`].
    #[instrument(skip(self, entity))]
    pub async fn remove(&self, entity: &dyn Entity) -> Result<IndexOutcome, IndexError> {
        let Some((type_name, foreign_id)) = self.resolve(entity)? else {
            return Ok(IndexOutcome::Skipped);
        };
        let key = EntityKey::new(type_name, foreign_id.as_str());
        if !self.visited_remove.insert(key.clone()).await {
            debug!(type_name, foreign_id = %foreign_id, "Already removed in this unit of work");
            return Ok(IndexOutcome::Skipped);
        }

        let mut deleted = 0;
        for model in self.metadata.indexed_ancestors(type_name) {
            match self.store.delete_entity(&foreign_id, model).await {
                Ok(count) => deleted += count,
                Err(e) => {
                    self.visited_remove.remove(&key).await;
                    return Err(e.into());
                }
            }
        }

        debug!(type_name, foreign_id = %foreign_id, deleted, "Entity removed from index");
        Ok(IndexOutcome::Removed { deleted })
    }

    /// Close the current unit of work; later calls index and remove again.
    pub async fn end_unit_of_work(&self) {
        self.visited_index.clear().await;
        self.visited_remove.clear().await;
    }

    /// Registered type and natural id of an indexable entity, or `None` if the
    /// entity is silently ignored.
    fn resolve(&self, entity: &dyn Entity) -> Result<Option<(&str, String)>, IndexError> {
        let any = entity.as_any();
        if any.is::<IndexEntry>() || any.is::<NewIndexEntry>() {
            return Ok(None);
        }
        let Some(type_name) = self.metadata.type_name_of(entity) else {
            return Ok(None);
        };
        if !self.metadata.is_indexed(type_name) {
            return Ok(None);
        }
        let foreign_id = self.metadata.id_accessor(type_name)?.read(entity)?;
        Ok(Some((type_name, foreign_id)))
    }
}
