//! Per-field index declarations.

use crate::formatter::{FormatterOptions, DEFAULT_FORMATTER};

/// How one field of a type is indexed.
///
/// A field is rendered by the named formatter, configured with `formatter_options`,
/// and its text is appended to every group listed in `groups`. A field without
/// groups is keyed by its own name.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub formatter: String,
    pub formatter_options: FormatterOptions,
    pub groups: Vec<String>,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            formatter: DEFAULT_FORMATTER.to_string(),
            formatter_options: FormatterOptions::new(),
            groups: Vec::new(),
        }
    }
}

impl IndexSpec {
    /// Index with the default formatter and no groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the named formatter.
    pub fn formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter = name.into();
        self
    }

    /// Set one formatter option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.formatter_options.insert(key.into(), value.into());
        self
    }

    /// Append the field to a group. Adding the same group twice has no effect.
    pub fn group(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.groups.contains(&name) {
            self.groups.push(name);
        }
        self
    }
}
