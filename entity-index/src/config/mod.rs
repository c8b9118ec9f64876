//! Configuration and dependency initialization.

mod dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::populator::{EmptyContentPolicy, PopulatorConfig, DEFAULT_BATCH_SIZE};
use crate::processor::KeyMode;

pub use dependencies::Dependencies;

/// Runtime settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// PostgreSQL connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// JSON fixture file; the bundled fixtures are used when unset.
    pub fixtures: Option<PathBuf>,
    pub populator: PopulatorConfig,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (default: in-memory store)
    /// - `POPULATE_BATCH_SIZE`: Entities per flushed batch (default: 200)
    /// - `INDEX_KEY_MODE`: "grouped" or "per-field" (default: grouped)
    /// - `INDEX_EMPTY_CONTENT`: "skip" or "write" (default: write)
    /// - `ENTITY_FIXTURES`: Path to a JSON fixture file (default: bundled fixtures)
    ///
    /// Invalid values are logged and replaced by their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let batch_size = match lookup("POPULATE_BATCH_SIZE").map(|v| v.parse::<usize>()) {
            Some(Ok(size)) if size > 0 => size,
            Some(_) => {
                warn!("Invalid POPULATE_BATCH_SIZE, defaulting to {}", DEFAULT_BATCH_SIZE);
                DEFAULT_BATCH_SIZE
            }
            None => DEFAULT_BATCH_SIZE,
        };

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            fixtures: lookup("ENTITY_FIXTURES").map(PathBuf::from),
            populator: PopulatorConfig {
                batch_size,
                key_mode: parse_or_default::<KeyMode>(lookup("INDEX_KEY_MODE"), "INDEX_KEY_MODE"),
                empty_content: parse_or_default::<EmptyContentPolicy>(
                    lookup("INDEX_EMPTY_CONTENT"),
                    "INDEX_EMPTY_CONTENT",
                ),
            },
        }
    }

    /// Override the batch size, e.g. from a command-line flag.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.populator.batch_size = batch_size;
        self
    }
}

fn parse_or_default<T>(value: Option<String>, name: &str) -> T
where
    T: FromStr<Err = String> + Default,
{
    match value.map(|v| v.parse::<T>()) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            warn!(variable = name, error = %e, "Invalid setting, using default");
            T::default()
        }
        None => T::default(),
    }
}
