//! Entity index metadata.
//!
//! Describes which fields of which entity types are indexed, how they are
//! grouped, and how to read them. Built once at startup from declarative
//! configuration; a missing accessor fails at build time rather than during
//! indexing.

mod accessor;
mod registry;
mod spec;
mod value;

pub use accessor::{FieldAccessor, IdAccessor};
pub use registry::{AbstractTypeBuilder, IndexMetadata, MetadataBuilder, TypeBuilder, TypeMetadata};
pub use spec::IndexSpec;
pub use value::FieldValue;
