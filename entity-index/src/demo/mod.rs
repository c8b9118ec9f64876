//! Demo schema wired into the `entity-index` binary.
//!
//! Companies and contacts, with contacts extending an abstract `Person` type.
//! Entities are loaded from a JSON fixture file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::errors::IndexError;
use crate::metadata::{IndexMetadata, IndexSpec, MetadataBuilder};
use crate::source::{InMemoryEntitySource, SourceError};
use crate::AppError;

const BUILTIN_FIXTURES: &str = include_str!("../../fixtures/demo.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub founded: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Name of the employer.
    #[serde(default)]
    pub company: Option<String>,
}

/// Index metadata of the demo schema.
///
/// - `Company`: `name` in group `company`, `city` in groups `company` and
///   `location`, `country` in group `location`, `founded` as a date on its own
/// - `Person` (abstract): `firstname` and `lastname` in group `person`
/// - `Contact` extends `Person`: `email` and `company` in group `contact`
pub fn metadata() -> Result<IndexMetadata, IndexError> {
    MetadataBuilder::new()
        .entity::<Company>("Company", |t| {
            t.id(|c| c.id)
                .field("name", |c| c.name.clone())
                .field("city", |c| c.city.clone())
                .field("country", |c| c.country.clone())
                .field("founded", |c| c.founded)
                .index("name", IndexSpec::new().group("company"))
                .index("city", IndexSpec::new().group("company").group("location"))
                .index("country", IndexSpec::new().group("location"))
                .index("founded", IndexSpec::new().formatter("date"))
        })
        .abstract_type("Person", |t| {
            t.index("firstname", IndexSpec::new().group("person"))
                .index("lastname", IndexSpec::new().group("person"))
        })
        .entity::<Contact>("Contact", |t| {
            t.parent("Person")
                .id(|c| c.id)
                .field("firstname", |c| c.firstname.clone())
                .field("lastname", |c| c.lastname.clone())
                .field("email", |c| c.email.clone())
                .field("company", |c| c.company.clone())
                .index("email", IndexSpec::new().group("contact"))
                .index("company", IndexSpec::new().group("contact"))
        })
        .build()
}

/// Entities of the demo schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoFixtures {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl DemoFixtures {
    /// Fixtures bundled with the binary.
    pub fn builtin() -> Result<Self, AppError> {
        Ok(serde_json::from_str(BUILTIN_FIXTURES)?)
    }

    /// Read fixtures from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let fixtures: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            companies = fixtures.companies.len(),
            contacts = fixtures.contacts.len(),
            "Fixtures loaded"
        );
        Ok(fixtures)
    }

    /// Build an in-memory source holding every fixture entity.
    pub fn into_source(self, metadata: Arc<IndexMetadata>) -> Result<InMemoryEntitySource, SourceError> {
        let mut source = InMemoryEntitySource::new(metadata);
        for company in self.companies {
            source.insert(company)?;
        }
        for contact in self.contacts {
            source.insert(contact)?;
        }
        Ok(source)
    }
}
