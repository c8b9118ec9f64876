//! Processor module for the entity index.
//!
//! Turns entity instances into keyed index content.

mod content_builder;

pub use content_builder::{ContentBuilder, KeyMode, KeyedContent};
