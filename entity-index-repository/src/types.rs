//! Request types for index store operations.

/// Row filter for substring search over the index table.
///
/// `term` is matched case-insensitively anywhere in `content`. `models` and
/// `fields` restrict the rows considered; `None` means no restriction and an
/// empty list matches nothing.
///
/// Matching rows come back ordered by id. `after_id` and `max_rows` page
/// through them: each page starts after the last id of the previous one.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    /// Text to look for.
    pub term: String,
    /// Allowed values of the `model` column.
    pub models: Option<Vec<String>>,
    /// Allowed values of the `field` column.
    pub fields: Option<Vec<String>>,
    /// Only rows with a greater id.
    pub after_id: Option<i64>,
    /// At most this many rows.
    pub max_rows: Option<usize>,
}

impl MatchFilter {
    /// Create an unrestricted filter for the given term.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            models: None,
            fields: None,
            after_id: None,
            max_rows: None,
        }
    }

    /// Restrict to the given models.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }

    /// Restrict to the given fields.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Cap the number of rows returned.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Start after the given row id.
    pub fn after(mut self, id: i64) -> Self {
        self.after_id = Some(id);
        self
    }

    /// Returns true if a row with the given columns passes the filter.
    ///
    /// Used by stores that evaluate the filter in process.
    pub fn matches(&self, model: &str, field: &str, content: &str) -> bool {
        if let Some(models) = &self.models {
            if !models.iter().any(|m| m == model) {
                return false;
            }
        }
        if let Some(fields) = &self.fields {
            if !fields.iter().any(|f| f == field) {
                return false;
            }
        }
        content
            .to_lowercase()
            .contains(&self.term.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_insensitive() {
        let filter = MatchFilter::new("mauri");
        assert!(filter.matches("Company", "company", "Mauricio SA"));
        assert!(!filter.matches("Company", "company", "Acme AG"));
    }

    #[test]
    fn test_matches_respects_scopes() {
        let filter = MatchFilter::new("Mauri")
            .with_models(vec!["Company".to_string()])
            .with_fields(vec!["company".to_string()]);
        assert!(filter.matches("Company", "company", "Mauricio SA"));
        assert!(!filter.matches("Contact", "company", "Mauricio SA"));
        assert!(!filter.matches("Company", "contact", "Mauricio SA"));

        let nothing = MatchFilter::new("Mauri").with_fields(vec![]);
        assert!(!nothing.matches("Company", "company", "Mauricio SA"));
    }
}
