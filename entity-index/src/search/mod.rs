//! Search query layer.
//!
//! Answers substring queries against the index store, scoped by entity type
//! and/or group, and folds the matching rows into one hit per entity.

use std::collections::HashMap;
use std::sync::Arc;

use entity_index_repository::{IndexStore, MatchFilter};
use entity_index_shared::{SearchHit, SearchQuery};
use tracing::{debug, instrument};

use crate::errors::IndexError;
use crate::metadata::IndexMetadata;

/// Read-only search over the index table.
pub struct SearchService {
    store: Arc<dyn IndexStore>,
    metadata: Arc<IndexMetadata>,
}

impl SearchService {
    pub fn new(store: Arc<dyn IndexStore>, metadata: Arc<IndexMetadata>) -> Self {
        Self { store, metadata }
    }

    /// Find entities whose indexed content contains the term, ignoring case.
    ///
    /// Rows of the same entity under several models of one hierarchy are merged
    /// into a single hit carrying the most specific model. At most `limit` hits
    /// are returned, in order of their first matching row.
    ///
    /// Rows are read in pages of `limit` rows and reading stops at the first row
    /// of an entity beyond the limit, so rows of a collected entity stored after
    /// that point do not add to its hit.
    ///
    /// The model of a hit can be abstract; see [`SearchService::concrete_types_of`].
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::Validation)` - If the term is blank or the limit is zero
    /// * `Err(IndexError::TypeNotMapped)` - If a type scope names an unknown type
    #[instrument(skip(self), fields(term = %query.term))]
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, IndexError> {
        query.validate().map_err(IndexError::validation)?;

        let mut filter = MatchFilter::new(query.term.as_str()).with_max_rows(query.limit);
        if let Some(types) = &query.types {
            filter = filter.with_models(self.expand_types(types)?);
        }
        if let Some(groups) = &query.groups {
            filter = filter.with_fields(groups.clone());
        }

        let mut hits: Vec<SearchHit> = Vec::new();
        let mut positions: HashMap<(String, String), usize> = HashMap::new();
        let mut row_count = 0;
        'pages: loop {
            let rows = self.store.find_matching(&filter).await?;
            let page_len = rows.len();
            row_count += page_len;

            for row in rows {
                filter.after_id = Some(row.id);
                let root = self.metadata.root_of(&row.model).unwrap_or(row.model.as_str()).to_string();
                match positions.get(&(root.clone(), row.foreign_id.clone())) {
                    Some(&position) => {
                        let hit = &mut hits[position];
                        if self.metadata.depth_of(&row.model) > self.metadata.depth_of(&hit.model) {
                            hit.model = row.model;
                        }
                        hit.add_field(&row.field);
                    }
                    None if hits.len() < query.limit => {
                        positions.insert((root, row.foreign_id.clone()), hits.len());
                        hits.push(SearchHit::new(row.model, row.foreign_id, row.field));
                    }
                    None => break 'pages,
                }
            }

            if page_len < query.limit {
                break;
            }
        }

        debug!(rows = row_count, hits = hits.len(), "Search completed");
        Ok(hits)
    }

    /// Concrete types the entity behind a hit can be an instance of.
    ///
    /// A hit on a concrete model yields that model alone. A hit on an abstract
    /// model yields its concrete subtypes, in registration order.
    pub fn concrete_types_of(&self, hit: &SearchHit) -> Vec<&str> {
        self.metadata
            .subtypes_of(&hit.model)
            .into_iter()
            .filter(|t| !self.metadata.is_abstract(t))
            .collect()
    }

    /// Each type plus its subtypes, deduplicated.
    fn expand_types(&self, types: &[String]) -> Result<Vec<String>, IndexError> {
        let mut models: Vec<String> = Vec::new();
        for type_name in types {
            if !self.metadata.is_mapped(type_name) {
                return Err(IndexError::type_not_mapped(type_name.as_str()));
            }
            for subtype in self.metadata.subtypes_of(type_name) {
                if !models.iter().any(|m| m == subtype) {
                    models.push(subtype.to_string());
                }
            }
        }
        Ok(models)
    }
}
