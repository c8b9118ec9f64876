//! Shared setup for the entity index integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use entity_index::demo::{self, DemoFixtures};
use entity_index::formatter::FormatterRegistry;
use entity_index::metadata::IndexMetadata;
use entity_index::output::ProgressSink;
use entity_index::source::InMemoryEntitySource;
use entity_index::{Populator, PopulatorConfig};
use entity_index_repository::{IndexStore, InMemoryIndexStore};
use entity_index_shared::IndexEntry;

pub struct Harness {
    pub metadata: Arc<IndexMetadata>,
    pub store: Arc<InMemoryIndexStore>,
    pub source: Arc<InMemoryEntitySource>,
    pub populator: Arc<Populator>,
}

pub fn demo_metadata() -> Arc<IndexMetadata> {
    Arc::new(demo::metadata().unwrap())
}

/// Populator over the bundled demo fixtures.
pub fn demo_harness(config: PopulatorConfig) -> Harness {
    let metadata = demo_metadata();
    let source = DemoFixtures::builtin()
        .unwrap()
        .into_source(metadata.clone())
        .unwrap();
    harness(metadata, source, config)
}

pub fn harness(
    metadata: Arc<IndexMetadata>,
    source: InMemoryEntitySource,
    config: PopulatorConfig,
) -> Harness {
    harness_with_store(metadata, source, config, Arc::new(InMemoryIndexStore::new()))
}

pub fn harness_with_store(
    metadata: Arc<IndexMetadata>,
    source: InMemoryEntitySource,
    config: PopulatorConfig,
    store: Arc<InMemoryIndexStore>,
) -> Harness {
    let source = Arc::new(source);
    let populator = Populator::new(
        store.clone() as Arc<dyn IndexStore>,
        source.clone(),
        metadata.clone(),
        &FormatterRegistry::with_defaults(),
        config,
    )
    .unwrap();
    Harness {
        metadata,
        store,
        source,
        populator: Arc::new(populator),
    }
}

/// Rows as comparable `(model, field, foreign_id, content)` tuples, sorted.
pub async fn row_set(store: &InMemoryIndexStore) -> Vec<(String, String, String, String)> {
    let mut rows: Vec<_> = store
        .entries()
        .await
        .into_iter()
        .map(|e| (e.model, e.field, e.foreign_id, e.content))
        .collect();
    rows.sort();
    rows
}

/// The row of one slot, if any.
pub async fn find_row(
    store: &InMemoryIndexStore,
    model: &str,
    field: &str,
    foreign_id: &str,
) -> Option<IndexEntry> {
    store.find_existing(model, field, foreign_id).await.unwrap()
}

/// Progress sink recording every call.
#[derive(Default)]
pub struct RecordingProgress {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn log(&self, message: &str) {
        self.calls.lock().unwrap().push(format!("log:{message}"));
    }

    fn progress_start(&self, max: u64) {
        self.calls.lock().unwrap().push(format!("start:{max}"));
    }

    fn set_progress(&self, current: u64) {
        self.calls.lock().unwrap().push(format!("progress:{current}"));
    }

    fn progress_finish(&self) {
        self.calls.lock().unwrap().push("finish".to_string());
    }
}
