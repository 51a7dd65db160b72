use drill_core::model::{Exemplar, ExemplarId, Topic, TopicInfo, TopicStatus};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteItemSource;
use super::mapping::id_to_i64;
use crate::repository::{StorageError, TopicCatalog};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn map_topic_row(row: &SqliteRow) -> Result<TopicInfo, StorageError> {
    let ser = |e: sqlx::Error| StorageError::Serialization(e.to_string());
    let status: Option<String> = row.try_get("status").map_err(ser)?;
    Ok(TopicInfo {
        topic: Topic::new(
            row.try_get::<String, _>("word_category").map_err(ser)?,
            row.try_get::<String, _>("subcategory").map_err(ser)?,
        ),
        status: TopicStatus::from_stored(status.as_deref()),
        difficulty: row.try_get("difficulty").map_err(ser)?,
        further_reading: row.try_get("further_reading").map_err(ser)?,
    })
}

fn map_exemplar_row(row: &SqliteRow) -> Result<Exemplar, StorageError> {
    let ser = |e: sqlx::Error| StorageError::Serialization(e.to_string());
    let id: i64 = row.try_get("id").map_err(ser)?;
    let id = u64::try_from(id)
        .map_err(|_| StorageError::Serialization("exemplar id sign overflow".into()))?;
    Ok(Exemplar {
        id: ExemplarId::new(id),
        name: row.try_get("exemplar").map_err(ser)?,
        gender: row.try_get("gender").map_err(ser)?,
        declension: row.try_get("weak_strong").map_err(ser)?,
        is_default: row.try_get("is_default").map_err(ser)?,
    })
}

const TOPIC_COLUMNS: &str = "s.word_category, s.subcategory, s.status, s.difficulty, s.further_reading";

impl SqliteItemSource {
    /// Insert or replace a catalog entry, registering its word category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be written.
    pub async fn upsert_topic(&self, info: &TopicInfo) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("INSERT INTO word_categories (word_category) VALUES (?1) ON CONFLICT DO NOTHING")
            .bind(info.topic.word_category())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO subcategories (word_category, subcategory, status, difficulty, further_reading)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(word_category, subcategory) DO UPDATE SET
                status = excluded.status,
                difficulty = excluded.difficulty,
                further_reading = excluded.further_reading
            ",
        )
        .bind(info.topic.word_category())
        .bind(info.topic.subcategory())
        .bind(info.status.as_str())
        .bind(info.difficulty.as_deref())
        .bind(info.further_reading.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)
    }

    /// Insert or replace an exemplar.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    pub async fn upsert_exemplar(&self, exemplar: &Exemplar) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO exemplars (id, exemplar, gender, weak_strong, is_default)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                exemplar = excluded.exemplar,
                gender = excluded.gender,
                weak_strong = excluded.weak_strong,
                is_default = excluded.is_default
            ",
        )
        .bind(id_to_i64("exemplar_id", exemplar.id.value())?)
        .bind(&exemplar.name)
        .bind(exemplar.gender.as_deref())
        .bind(exemplar.declension.as_deref())
        .bind(exemplar.is_default)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TopicCatalog for SqliteItemSource {
    async fn topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM subcategories s \
             JOIN word_categories w ON w.word_category = s.word_category \
             WHERE s.status = 'online' \
             ORDER BY s.word_category, s.subcategory"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_topic_row).collect()
    }

    async fn topic(&self, topic: &Topic) -> Result<TopicInfo, StorageError> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM subcategories s \
             WHERE s.word_category = ?1 AND s.subcategory = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(topic.word_category())
            .bind(topic.subcategory())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_topic_row(&row)
    }

    async fn exemplars(&self) -> Result<Vec<Exemplar>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, exemplar, gender, weak_strong, is_default FROM exemplars ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_exemplar_row).collect()
    }
}
