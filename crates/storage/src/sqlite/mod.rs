use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod catalog;
mod item_source;
mod mapping;
mod migrate;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentence pool and topic catalog in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteItemSource {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteItemSource {
    /// Open the sentence database at `database_url`, creating the file if needed.
    ///
    /// Connections run in WAL mode so readers never block on a seeding writer.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` for a malformed URL or an unreachable database.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the sentence and catalog tables up to the latest schema.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration step fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate a sentence database, serving both items and catalog.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let source = SqliteItemSource::connect(database_url).await?;
        source.migrate().await?;
        Ok(Self::from_source(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent_and_create_every_table() {
        let source = SqliteItemSource::connect("sqlite:file:memdb_schema?mode=memory&cache=shared")
            .await
            .unwrap();
        source.migrate().await.unwrap();
        source.migrate().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(source.pool())
        .await
        .unwrap();
        assert_eq!(
            tables,
            vec![
                "exemplars",
                "schema_migrations",
                "sentences",
                "subcategories",
                "word_categories"
            ]
        );
    }

    #[test]
    fn source_serves_both_storage_handles() {
        fn assert_backend<T: crate::ItemSource + crate::TopicCatalog + Clone>() {}
        assert_backend::<SqliteItemSource>();
    }
}
