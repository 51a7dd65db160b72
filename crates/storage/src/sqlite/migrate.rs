use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migrations in order, skipping versions already applied.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: sentence pool.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
                CREATE TABLE IF NOT EXISTS sentences (
                    id INTEGER NOT NULL,
                    word_category TEXT NOT NULL,
                    subcategory TEXT NOT NULL,
                    icelandic_left TEXT NOT NULL DEFAULT '',
                    icelandic_right TEXT NOT NULL DEFAULT '',
                    english_translation TEXT NOT NULL DEFAULT '',
                    correct_answer TEXT NOT NULL CHECK (length(trim(correct_answer)) > 0),
                    base_form TEXT NOT NULL DEFAULT '',
                    "case" TEXT,
                    number TEXT,
                    definiteness TEXT,
                    exemplar_id INTEGER,
                    PRIMARY KEY (word_category, subcategory, id)
                );
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sentences_topic
                ON sentences (word_category, subcategory);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS word_categories (
                    word_category TEXT PRIMARY KEY,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS subcategories (
                    word_category TEXT NOT NULL
                        REFERENCES word_categories(word_category) ON DELETE CASCADE,
                    subcategory TEXT NOT NULL,
                    status TEXT,
                    difficulty TEXT,
                    further_reading TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (word_category, subcategory)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exemplars (
                    id INTEGER PRIMARY KEY,
                    exemplar TEXT NOT NULL,
                    gender TEXT,
                    weak_strong TEXT,
                    is_default INTEGER NOT NULL DEFAULT 0
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, datetime('now'))
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
