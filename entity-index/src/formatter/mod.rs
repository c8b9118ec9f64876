//! Formatter pipeline.
//!
//! A formatter turns one raw field value into search-ready text. Formatters are
//! resolved by name from a [`FormatterRegistry`], configured once per indexed
//! field, and then rendered for every entity instance.

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::IndexError;
use crate::metadata::FieldValue;

pub use builtin::{BooleanFormatter, DateFormatter, DefaultFormatter, NumberFormatter};

/// Per-field formatter options.
pub type FormatterOptions = serde_json::Map<String, serde_json::Value>;

/// Name of the formatter used when a field names none.
pub const DEFAULT_FORMATTER: &str = "default";

/// Converts a raw field value into search-ready text.
pub trait Formatter: Send + Sync {
    /// Apply options. Options not given revert to their defaults, so repeated calls
    /// with different options do not accumulate.
    fn configure(&mut self, options: &FormatterOptions);

    /// Render a value. Never fails; `FieldValue::Null` renders as `""`.
    fn render(&self, value: &FieldValue) -> String;
}

type FormatterFactory = Arc<dyn Fn() -> Box<dyn Formatter> + Send + Sync>;

/// Named formatter factories.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    factories: HashMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in formatters: `default`, `date`, `datetime`,
    /// `boolean` and `number`.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(DEFAULT_FORMATTER, || Box::new(DefaultFormatter))
            .register("date", || Box::new(DateFormatter::date()))
            .register("datetime", || Box::new(DateFormatter::datetime()))
            .register("boolean", || Box::new(BooleanFormatter::default()))
            .register("number", || Box::new(NumberFormatter::default()))
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Formatter> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Create a fresh, unconfigured formatter.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::Configuration)` - If no formatter is registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Formatter>, IndexError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| IndexError::configuration(format!("unknown formatter '{name}'")))
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FormatterRegistry").field("formatters", &names).finish()
    }
}
