//! Dependency initialization and wiring for the entity index.

use std::sync::Arc;

use entity_index_repository::{InMemoryIndexStore, IndexStore, PostgresIndexStore};
use tracing::info;

use crate::config::Settings;
use crate::demo::{self, DemoFixtures};
use crate::errors::IndexError;
use crate::formatter::FormatterRegistry;
use crate::listener::EntityListener;
use crate::metadata::IndexMetadata;
use crate::populator::Populator;
use crate::search::SearchService;
use crate::AppError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub metadata: Arc<IndexMetadata>,
    pub store: Arc<dyn IndexStore>,
    pub populator: Arc<Populator>,
    pub listener: EntityListener,
    pub search: SearchService,
    /// True when the index lives in PostgreSQL and outlives the process.
    pub persistent: bool,
}

impl Dependencies {
    /// Build the demo schema, its fixture source and the index store.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies with the store schema in place
    /// * `Err(AppError)` - If fixtures cannot be read or the store cannot be reached
    pub async fn new(settings: &Settings) -> Result<Self, AppError> {
        info!(
            persistent = settings.database_url.is_some(),
            fixtures = ?settings.fixtures,
            batch_size = settings.populator.batch_size,
            key_mode = ?settings.populator.key_mode,
            empty_content = ?settings.populator.empty_content,
            "Initializing dependencies"
        );

        let metadata = Arc::new(demo::metadata()?);

        let fixtures = match &settings.fixtures {
            Some(path) => DemoFixtures::load(path)?,
            None => DemoFixtures::builtin()?,
        };
        let source = Arc::new(
            fixtures
                .into_source(metadata.clone())
                .map_err(IndexError::from)?,
        );

        let store: Arc<dyn IndexStore> = match &settings.database_url {
            Some(url) => {
                let store = PostgresIndexStore::connect(url)
                    .await
                    .map_err(IndexError::from)?;
                info!("Connected to PostgreSQL index store");
                Arc::new(store)
            }
            None => {
                info!("DATABASE_URL not set, using in-memory index store");
                Arc::new(InMemoryIndexStore::new())
            }
        };
        store.ensure_schema().await.map_err(IndexError::from)?;

        let populator = Arc::new(Populator::new(
            store.clone(),
            source,
            metadata.clone(),
            &FormatterRegistry::with_defaults(),
            settings.populator,
        )?);
        let listener = EntityListener::new(populator.clone());
        let search = SearchService::new(store.clone(), metadata.clone());

        Ok(Self {
            metadata,
            store,
            populator,
            listener,
            search,
            persistent: settings.database_url.is_some(),
        })
    }
}
