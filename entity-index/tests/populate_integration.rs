//! Integration tests for the full reindex.
//!
//! These tests run the real Populator against the in-memory index store and
//! entity source, seeded with the demo schema.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use common::{demo_harness, demo_metadata, find_row, harness, row_set, RecordingProgress};
use entity_index::demo::{Company, DemoFixtures};
use entity_index::metadata::{IndexSpec, MetadataBuilder};
use entity_index::output::NullProgress;
use entity_index::processor::KeyMode;
use entity_index::source::{
    Entity, EntitySource, EntityStream, InMemoryEntitySource, PopulateQuery, SourceError,
};
use entity_index::{IndexError, PopulateSummary, PopulatorConfig};
use entity_index_repository::IndexStore;
use entity_index_shared::NewIndexEntry;

fn company(id: u64, name: &str) -> Company {
    Company {
        id,
        name: name.to_string(),
        city: None,
        country: None,
        founded: None,
    }
}

#[tokio::test]
async fn test_populate_builds_grouped_rows() {
    let h = demo_harness(PopulatorConfig::default());

    let summary = h.populator.populate(&NullProgress, None).await.unwrap();
    assert_eq!(
        summary,
        PopulateSummary {
            types_indexed: 2,
            types_skipped: 1,
            entities_processed: 7,
            rows_written: 15,
            batches: 2,
        }
    );

    let row = find_row(&h.store, "Company", "company", "1").await.unwrap();
    assert_eq!(row.content, "Mauricio SA Lausanne");
    let row = find_row(&h.store, "Company", "location", "1").await.unwrap();
    assert_eq!(row.content, "Lausanne Switzerland");
    let row = find_row(&h.store, "Company", "founded", "1").await.unwrap();
    assert_eq!(row.content, "01.04.1987");

    // Contacts get rows for their own type and for the abstract Person type.
    let row = find_row(&h.store, "Contact", "contact", "2").await.unwrap();
    assert_eq!(row.content, "jen@mauricio.example Mauricio SA");
    let row = find_row(&h.store, "Person", "person", "2").await.unwrap();
    assert_eq!(row.content, "Jen Barber");
}

#[tokio::test]
async fn test_populate_skips_blank_rows() {
    let h = demo_harness(PopulatorConfig::default());
    h.populator.populate(&NullProgress, None).await.unwrap();

    // Acme Corp has no city and no founding date.
    let row = find_row(&h.store, "Company", "company", "3").await.unwrap();
    assert_eq!(row.content, "Acme Corp");
    assert!(find_row(&h.store, "Company", "founded", "3").await.is_none());

    // Douglas Reynholm has neither email nor company.
    assert!(find_row(&h.store, "Contact", "contact", "4").await.is_none());
    assert!(find_row(&h.store, "Person", "person", "4").await.is_some());

    assert!(h.store.entries().await.iter().all(|e| !e.content.trim().is_empty()));
}

#[tokio::test]
async fn test_populate_is_idempotent() {
    let h = demo_harness(PopulatorConfig::default());
    h.store
        .bulk_insert(&[NewIndexEntry::new("99", "Company", "company", "stale")])
        .await
        .unwrap();

    h.populator.populate(&NullProgress, None).await.unwrap();
    let first = row_set(&h.store).await;
    h.populator.populate(&NullProgress, None).await.unwrap();
    let second = row_set(&h.store).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 15);
    assert!(find_row(&h.store, "Company", "company", "99").await.is_none());
    assert_eq!(h.store.stats().await.truncates, 2);
}

#[tokio::test]
async fn test_populate_reports_progress() {
    let h = demo_harness(PopulatorConfig::default());
    let progress = RecordingProgress::default();

    h.populator.populate(&progress, None).await.unwrap();

    assert_eq!(
        progress.calls(),
        vec![
            "log:Flushing index table",
            "log:Indexing Company",
            "start:3",
            "finish",
            "log:Indexing Contact",
            "start:4",
            "finish",
        ]
    );
}

#[tokio::test]
async fn test_populate_flushes_in_batches() {
    let metadata = demo_metadata();
    let mut source = InMemoryEntitySource::new(metadata.clone());
    for id in 1..=1000 {
        source.insert(company(id, &format!("Company {id}"))).unwrap();
    }
    let h = harness(metadata, source, PopulatorConfig::default());
    let progress = RecordingProgress::default();

    let summary = h.populator.populate(&progress, Some("Company")).await.unwrap();

    let stats = h.store.stats().await;
    assert_eq!(stats.bulk_inserts, 5);
    assert_eq!(stats.inserted_rows, 1000);
    assert_eq!(summary.batches, 5);
    assert_eq!(summary.entities_processed, 1000);
    // One reclamation per batch plus the final one.
    assert_eq!(h.source.detach_count(), 6);

    let calls = progress.calls();
    assert!(calls.contains(&"start:1000".to_string()));
    for current in [200, 400, 600, 800, 1000] {
        assert!(calls.contains(&format!("progress:{current}")));
    }
    assert_eq!(calls.last().map(String::as_str), Some("finish"));
}

#[tokio::test]
async fn test_populate_flushes_remainder() {
    let metadata = demo_metadata();
    let mut source = InMemoryEntitySource::new(metadata.clone());
    for id in 1..=1000 {
        source.insert(company(id, &format!("Company {id}"))).unwrap();
    }
    let config = PopulatorConfig {
        batch_size: 300,
        ..PopulatorConfig::default()
    };
    let h = harness(metadata, source, config);

    h.populator.populate(&NullProgress, Some("Company")).await.unwrap();

    assert_eq!(h.store.stats().await.bulk_inserts, 4);
    assert_eq!(h.store.len().await, 1000);
    assert_eq!(h.source.detach_count(), 4);
}

#[tokio::test]
async fn test_unmapped_scope_fails_before_truncating() {
    let h = demo_harness(PopulatorConfig::default());
    h.store
        .bulk_insert(&[NewIndexEntry::new("1", "Company", "company", "Mauricio SA")])
        .await
        .unwrap();

    let result = h.populator.populate(&NullProgress, Some("Unmapped")).await;

    assert!(matches!(result, Err(IndexError::TypeNotMapped(ref t)) if t == "Unmapped"));
    assert_eq!(h.store.stats().await.truncates, 0);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_unindexed_scope_fails_before_truncating() {
    struct Note {
        id: u64,
    }

    let metadata = Arc::new(
        MetadataBuilder::new()
            .entity::<Company>("Company", |t| {
                t.id(|c| c.id)
                    .field("name", |c| c.name.clone())
                    .index("name", IndexSpec::new())
            })
            .entity::<Note>("Note", |t| t.id(|n| n.id))
            .build()
            .unwrap(),
    );
    let h = harness(
        metadata.clone(),
        InMemoryEntitySource::new(metadata),
        PopulatorConfig::default(),
    );

    let result = h.populator.populate(&NullProgress, Some("Note")).await;

    assert!(matches!(result, Err(IndexError::TypeNotIndexed(_))));
    assert_eq!(h.store.stats().await.truncates, 0);
}

#[tokio::test]
async fn test_abstract_scope_covers_subtypes() {
    let h = demo_harness(PopulatorConfig::default());

    let summary = h.populator.populate(&NullProgress, Some("Person")).await.unwrap();

    assert_eq!(summary.types_indexed, 1);
    assert_eq!(summary.types_skipped, 1);
    assert_eq!(summary.entities_processed, 4);
    assert!(h
        .store
        .entries()
        .await
        .iter()
        .all(|e| e.model == "Contact" || e.model == "Person"));
}

#[tokio::test]
async fn test_per_field_key_mode() {
    let h = demo_harness(PopulatorConfig {
        key_mode: KeyMode::PerField,
        ..PopulatorConfig::default()
    });
    h.populator.populate(&NullProgress, Some("Company")).await.unwrap();

    let fields: Vec<String> = h
        .store
        .entries()
        .await
        .into_iter()
        .filter(|e| e.foreign_id == "1")
        .map(|e| e.field)
        .collect();
    assert_eq!(fields, vec!["name", "city", "country", "founded"]);
    let row = find_row(&h.store, "Company", "name", "1").await.unwrap();
    assert_eq!(row.content, "Mauricio SA");
}

struct SelectedCompanies {
    entities: Vec<Arc<dyn Entity>>,
}

#[async_trait]
impl PopulateQuery for SelectedCompanies {
    async fn count(&self) -> Result<u64, SourceError> {
        Ok(self.entities.len() as u64)
    }

    fn stream(&self) -> EntityStream<'_> {
        stream::iter(self.entities.clone().into_iter().map(Ok)).boxed()
    }
}

#[tokio::test]
async fn test_custom_populate_query_replaces_default() {
    let metadata = demo_metadata();
    let selected: Arc<dyn Entity> = Arc::new(company(42, "Selected AG"));
    let query = SelectedCompanies {
        entities: vec![selected],
    };
    let source = DemoFixtures::builtin()
        .unwrap()
        .into_source(metadata.clone())
        .unwrap()
        .with_populate_query("Company", Arc::new(query));
    assert!(source.populate_query("Company").is_some());
    let h = harness(metadata, source, PopulatorConfig::default());

    let summary = h.populator.populate(&NullProgress, Some("Company")).await.unwrap();

    assert_eq!(summary.entities_processed, 1);
    let rows = h.store.entries().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].foreign_id, "42");
    assert_eq!(rows[0].content, "Selected AG");
}

struct FailingQuery;

#[async_trait]
impl PopulateQuery for FailingQuery {
    async fn count(&self) -> Result<u64, SourceError> {
        Ok(1)
    }

    fn stream(&self) -> EntityStream<'_> {
        stream::once(async { Err(SourceError::Unavailable("cursor closed".to_string())) }).boxed()
    }
}

#[tokio::test]
async fn test_source_errors_propagate() {
    let metadata = demo_metadata();
    let source =
        InMemoryEntitySource::new(metadata.clone()).with_populate_query("Company", Arc::new(FailingQuery));
    let h = harness(metadata, source, PopulatorConfig::default());

    let result = h.populator.populate(&NullProgress, Some("Company")).await;

    assert!(matches!(
        result,
        Err(IndexError::Source(SourceError::Unavailable(_)))
    ));
}
