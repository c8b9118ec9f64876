//! Integration tests for the search query layer over a populated demo index.

mod common;

use common::{demo_harness, Harness};
use entity_index::output::NullProgress;
use entity_index::{IndexError, PopulatorConfig, SearchService};
use entity_index_shared::{SearchHit, SearchQuery};

async fn populated() -> (Harness, SearchService) {
    let h = demo_harness(PopulatorConfig::default());
    h.populator.populate(&NullProgress, None).await.unwrap();
    let search = SearchService::new(h.store.clone(), h.metadata.clone());
    (h, search)
}

fn ids(hits: &[SearchHit]) -> Vec<(&str, &str)> {
    hits.iter()
        .map(|h| (h.model.as_str(), h.foreign_id.as_str()))
        .collect()
}

#[tokio::test]
async fn test_search_all() {
    let (_h, search) = populated().await;

    let hits = search.search(&SearchQuery::new("Mauri")).await.unwrap();

    assert_eq!(
        ids(&hits),
        vec![("Company", "1"), ("Person", "1"), ("Contact", "2")]
    );
    assert_eq!(hits[0].matched_fields, vec!["company"]);
    assert_eq!(hits[2].matched_fields, vec!["contact"]);

    // Maurice Moss matched only on the abstract Person rows.
    assert_eq!(search.concrete_types_of(&hits[1]), vec!["Contact"]);
    assert_eq!(search.concrete_types_of(&hits[0]), vec!["Company"]);
}

#[tokio::test]
async fn test_search_scoped_to_type() {
    let (_h, search) = populated().await;

    let hits = search
        .search(&SearchQuery::new("Mauri").with_types(["Company"]))
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![("Company", "1")]);

    let hits = search
        .search(&SearchQuery::new("Mauri").with_types(["Person"]))
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![("Person", "1"), ("Contact", "2")]);
}

#[tokio::test]
async fn test_search_scoped_to_group() {
    let (_h, search) = populated().await;

    let hits = search
        .search(&SearchQuery::new("Mauri").with_groups(["company"]))
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![("Company", "1")]);

    let hits = search
        .search(&SearchQuery::new("Mauri").with_groups(["contact"]))
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![("Contact", "2")]);
}

#[tokio::test]
async fn test_search_merges_rows_of_one_entity() {
    let (_h, search) = populated().await;

    // Matches both the Contact row and the Person row of Roy Trenneman.
    let hits = search.search(&SearchQuery::new("roy")).await.unwrap();

    assert_eq!(ids(&hits), vec![("Contact", "3")]);
    assert_eq!(hits[0].matched_fields, vec!["contact", "person"]);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_literal() {
    let (_h, search) = populated().await;

    let hits = search.search(&SearchQuery::new("mAuRi")).await.unwrap();
    assert_eq!(hits.len(), 3);

    let hits = search.search(&SearchQuery::new("%")).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_errors() {
    let (_h, search) = populated().await;

    let result = search
        .search(&SearchQuery::new("Mauri").with_types(["Invoice"]))
        .await;
    assert!(matches!(result, Err(IndexError::TypeNotMapped(ref t)) if t == "Invoice"));

    let result = search.search(&SearchQuery::new("")).await;
    assert!(matches!(result, Err(IndexError::Validation(_))));
}
