//! Search result types for the entity index.

use serde::{Deserialize, Serialize};

/// A single matching entity.
///
/// Carries enough to load the entity from the persistence layer: the type the
/// matching row was indexed under and the natural identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    /// Most specific indexed type among the matching rows.
    pub model: String,

    /// Natural identifier of the entity.
    pub foreign_id: String,

    /// Group or field keys whose content matched.
    pub matched_fields: Vec<String>,
}

impl SearchHit {
    /// Create a hit for a single matching key.
    pub fn new(
        model: impl Into<String>,
        foreign_id: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            foreign_id: foreign_id.into(),
            matched_fields: vec![field.into()],
        }
    }

    /// Record another matching key, ignoring duplicates.
    pub fn add_field(&mut self, field: &str) {
        if !self.matched_fields.iter().any(|f| f == field) {
            self.matched_fields.push(field.to_string());
        }
    }
}
