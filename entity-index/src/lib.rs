//! # Entity Index
//!
//! Keeps a denormalized search index table in sync with persisted entities and
//! answers substring searches against it.
//!
//! ## Architecture
//!
//! 1. **Metadata**: Declares which fields of which types are indexed, and how
//! 2. **Processor**: Builds grouped content for an entity instance
//! 3. **Loader**: Buffers rows and writes them to the index store in bulk
//! 4. **Populator**: Runs the full reindex and the incremental paths
//! 5. **Listener**: Drives incremental indexing from lifecycle events
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`demo`]: Demo schema and fixtures used by the binary
//! - [`errors`]: Error types for the engine
//! - [`formatter`]: Field value formatters
//! - [`listener`]: Lifecycle event listener
//! - [`loader`]: Buffered writes to the index store
//! - [`metadata`]: Index metadata registry
//! - [`output`]: Progress sinks
//! - [`populator`]: Full and incremental indexing
//! - [`processor`]: Content building
//! - [`search`]: Search query layer
//! - [`source`]: Entity source traits

pub mod config;
pub mod demo;
pub mod errors;
pub mod formatter;
pub mod listener;
pub mod loader;
pub mod metadata;
pub mod output;
pub mod populator;
pub mod processor;
pub mod search;
pub mod source;

pub use config::{Dependencies, Settings};
pub use errors::IndexError;
pub use listener::{EntityListener, LifecycleEvent};
pub use populator::{IndexOutcome, PopulateSummary, Populator, PopulatorConfig};
pub use search::SearchService;

use thiserror::Error;

/// Errors that can occur during startup or execution of the binary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit code: 2 for an unknown or unindexed type argument, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Index(e) if e.is_type_error() => 2,
            _ => 1,
        }
    }
}
