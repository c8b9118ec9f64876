//! PostgreSQL implementation of the entity index store.
//!
//! ## Database Tables
//!
//! - `search_index`: one row per `(model, field, foreign_id)` slot, created by
//!   `migrations/0001_create_search_index.sql`
//!
//! Bulk inserts use `QueryBuilder::push_values`, split into chunks that stay
//! below the bind-parameter limit.

use async_trait::async_trait;
use entity_index_shared::{IndexEntry, NewIndexEntry};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

use crate::config::IndexStoreConfig;
use crate::errors::IndexStoreError;
use crate::interfaces::IndexStore;
use crate::types::MatchFilter;
use crate::utils::like_pattern;

const SELECT_COLUMNS: &str = "SELECT id, foreign_id, model, field, content FROM search_index";

#[derive(sqlx::FromRow)]
struct IndexRow {
    id: i64,
    foreign_id: String,
    model: String,
    field: String,
    content: String,
}

impl From<IndexRow> for IndexEntry {
    fn from(row: IndexRow) -> Self {
        IndexEntry {
            id: row.id,
            foreign_id: row.foreign_id,
            model: row.model,
            field: row.field,
            content: row.content,
        }
    }
}

/// PostgreSQL-backed index store.
///
/// ## Features
///
/// - Connection pooling with `sqlx::PgPool`
/// - Multi-row `INSERT` statements for bulk writes
/// - Case-insensitive substring matching with `ILIKE`
pub struct PostgresIndexStore {
    pool: PgPool,
    config: IndexStoreConfig,
}

impl PostgresIndexStore {
    /// Create a store over an existing pool with default configuration.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: IndexStoreConfig::default(),
        }
    }

    /// Create a store over an existing pool with custom configuration.
    pub fn with_config(pool: PgPool, config: IndexStoreConfig) -> Self {
        Self { pool, config }
    }

    /// Connect to the database at `database_url`.
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresIndexStore)` - Ready-to-use store; call `ensure_schema` before use
    /// * `Err(IndexStoreError)` - If the connection fails
    pub async fn connect(database_url: &str) -> Result<Self, IndexStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IndexStore for PostgresIndexStore {
    async fn ensure_schema(&self) -> Result<(), IndexStoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Index schema is up to date");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn truncate(&self) -> Result<(), IndexStoreError> {
        sqlx::query("TRUNCATE TABLE search_index RESTART IDENTITY")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, entries), fields(row_count = entries.len()))]
    async fn bulk_insert(&self, entries: &[NewIndexEntry]) -> Result<u64, IndexStoreError> {
        let mut inserted = 0;
        for chunk in entries.chunks(self.config.chunk_size()) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO search_index (foreign_id, model, field, content) ");
            query_builder.push_values(chunk, |mut b, entry| {
                b.push_bind(entry.foreign_id.as_str())
                    .push_bind(entry.model.as_str())
                    .push_bind(entry.field.as_str())
                    .push_bind(entry.content.as_str());
            });
            let result = query_builder.build().execute(&self.pool).await?;
            inserted += result.rows_affected();
        }
        debug!(inserted, "Bulk insert complete");
        Ok(inserted)
    }

    async fn find_existing(
        &self,
        model: &str,
        field: &str,
        foreign_id: &str,
    ) -> Result<Option<IndexEntry>, IndexStoreError> {
        let row = sqlx::query_as::<_, IndexRow>(&format!(
            "{SELECT_COLUMNS} WHERE model = $1 AND field = $2 AND foreign_id = $3 LIMIT 1"
        ))
        .bind(model)
        .bind(field)
        .bind(foreign_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(IndexEntry::from))
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<(), IndexStoreError> {
        let result = sqlx::query("UPDATE search_index SET content = $1 WHERE id = $2")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(IndexStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_entity(&self, foreign_id: &str, model: &str) -> Result<u64, IndexStoreError> {
        let result = sqlx::query("DELETE FROM search_index WHERE foreign_id = $1 AND model = $2")
            .bind(foreign_id)
            .bind(model)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(term = %filter.term))]
    async fn find_matching(&self, filter: &MatchFilter) -> Result<Vec<IndexEntry>, IndexStoreError> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        query_builder
            .push(" WHERE content ILIKE ")
            .push_bind(like_pattern(&filter.term))
            .push(" ESCAPE '\\'");
        if let Some(models) = &filter.models {
            query_builder
                .push(" AND model = ANY(")
                .push_bind(models.clone())
                .push(")");
        }
        if let Some(fields) = &filter.fields {
            query_builder
                .push(" AND field = ANY(")
                .push_bind(fields.clone())
                .push(")");
        }
        if let Some(after_id) = filter.after_id {
            query_builder.push(" AND id > ").push_bind(after_id);
        }
        query_builder.push(" ORDER BY id");
        if let Some(max_rows) = filter.max_rows {
            query_builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(max_rows).unwrap_or(i64::MAX));
        }

        let rows = query_builder
            .build_query_as::<IndexRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!(row_count = rows.len(), "Matched index rows");
        Ok(rows.into_iter().map(IndexEntry::from).collect())
    }
}
