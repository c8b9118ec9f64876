//! Configuration types for the index store implementations.

/// Upper bound on rows per statement imposed by the PostgreSQL bind-parameter
/// limit (65535 parameters, four per row).
pub const MAX_ROWS_PER_STATEMENT: usize = 16_383;

/// Configuration for the index store.
///
/// Bulk inserts accept any number of rows; the store splits them into
/// statements of at most `max_rows_per_statement` rows.
#[derive(Debug, Clone)]
pub struct IndexStoreConfig {
    /// Maximum number of rows bound into one `INSERT` statement.
    ///
    /// Defaults to 1000. Values above [`MAX_ROWS_PER_STATEMENT`] are clamped.
    pub max_rows_per_statement: usize,
}

impl Default for IndexStoreConfig {
    fn default() -> Self {
        Self {
            max_rows_per_statement: 1000,
        }
    }
}

impl IndexStoreConfig {
    /// Create a config with a custom statement size.
    ///
    /// # Arguments
    ///
    /// * `rows` - Maximum number of rows per `INSERT` statement
    ///
    /// # Returns
    ///
    /// An `IndexStoreConfig` whose limit is clamped to `1..=MAX_ROWS_PER_STATEMENT`.
    pub fn with_max_rows_per_statement(rows: usize) -> Self {
        Self {
            max_rows_per_statement: rows.clamp(1, MAX_ROWS_PER_STATEMENT),
        }
    }

    /// Effective chunk size, always within bounds.
    pub fn chunk_size(&self) -> usize {
        self.max_rows_per_statement.clamp(1, MAX_ROWS_PER_STATEMENT)
    }
}
