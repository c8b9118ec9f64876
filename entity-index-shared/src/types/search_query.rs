//! Search query types for the entity index.
//!
//! This module defines the query structure used to search the index table.

use serde::{Deserialize, Serialize};

/// Search query parameters.
///
/// The term is matched as a case-insensitive substring of the indexed content.
/// `types` and `groups` narrow the rows considered; `None` means no restriction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// The text to look for.
    pub term: String,

    /// Entity type names to search in. Each name also covers its subtypes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    /// Group (or field) keys to search in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    /// Maximum number of distinct entities to return.
    /// Default is 50, maximum is 1000.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl SearchQuery {
    /// Create an unscoped query.
    ///
    /// # Example
    ///
    /// ```
    /// use entity_index_shared::SearchQuery;
    ///
    /// let query = SearchQuery::new("Mauri");
    /// assert!(query.types.is_none());
    /// ```
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            types: None,
            groups: None,
            limit: default_limit(),
        }
    }

    /// Restrict the query to the given entity types (and their subtypes).
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the query to the given groups.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Set the limit for results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(1000);
        self
    }

    /// Validate the query parameters.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.term.trim().is_empty() {
            return Err("Search term cannot be empty".to_string());
        }
        if self.limit == 0 {
            return Err("Limit must be greater than zero".to_string());
        }
        Ok(())
    }
}
