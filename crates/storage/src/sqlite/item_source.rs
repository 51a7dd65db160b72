use drill_core::model::{ExerciseItem, Topic};
use tracing::debug;

use super::SqliteItemSource;
use super::mapping::{id_to_i64, map_item_row};
use crate::repository::{ItemQuery, ItemRecord, ItemSource, StorageError};

enum Param {
    Int(i64),
    Text(String),
}

/// Appends `<head>(?n, ...)` and queues the values.
fn push_in_list(sql: &mut String, params: &mut Vec<Param>, head: &str, values: Vec<Param>) {
    sql.push_str(head);
    sql.push('(');
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        params.push(value);
        sql.push('?');
        sql.push_str(&params.len().to_string());
    }
    sql.push(')');
}

fn build_fetch_sql(query: &ItemQuery) -> Result<(String, Vec<Param>), StorageError> {
    let mut sql = String::from(
        r#"
        SELECT
            id, word_category, subcategory, icelandic_left, icelandic_right,
            english_translation, correct_answer, base_form, "case", number,
            definiteness, exemplar_id
        FROM sentences
        WHERE word_category = ?1 AND subcategory = ?2"#,
    );
    let mut params = vec![
        Param::Text(query.topic.word_category().to_owned()),
        Param::Text(query.topic.subcategory().to_owned()),
    ];

    let excluded = query
        .exclude_mastered
        .iter()
        .chain(query.exclude_retry.iter())
        .map(|id| id_to_i64("item_id", id.value()).map(Param::Int))
        .collect::<Result<Vec<_>, _>>()?;
    if !excluded.is_empty() {
        push_in_list(&mut sql, &mut params, " AND id NOT IN ", excluded);
    }

    if let Some(filters) = &query.filters {
        let text = |set: &std::collections::BTreeSet<String>| {
            set.iter().cloned().map(Param::Text).collect::<Vec<_>>()
        };
        push_in_list(&mut sql, &mut params, r#" AND "case" IN "#, text(filters.cases()));
        push_in_list(&mut sql, &mut params, " AND number IN ", text(filters.numbers()));
        push_in_list(
            &mut sql,
            &mut params,
            " AND definiteness IN ",
            text(filters.definiteness()),
        );

        let exemplars = filters
            .exemplars()
            .iter()
            .map(|id| id_to_i64("exemplar_id", id.value()).map(Param::Int))
            .collect::<Result<Vec<_>, _>>()?;
        push_in_list(
            &mut sql,
            &mut params,
            " AND (exemplar_id IS NULL OR exemplar_id IN ",
            exemplars,
        );
        sql.push(')');
    }

    let limit = i64::try_from(query.count)
        .map_err(|_| StorageError::Serialization("count overflow".into()))?;
    params.push(Param::Int(limit));
    sql.push_str(" ORDER BY RANDOM() LIMIT ?");
    sql.push_str(&params.len().to_string());

    Ok((sql, params))
}

impl SqliteItemSource {
    /// Insert or replace a sentence under a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    pub async fn upsert_item(&self, topic: &Topic, item: &ExerciseItem) -> Result<(), StorageError> {
        let record = ItemRecord::from_item(topic, item);
        let exemplar = record
            .exemplar
            .map(|id| id_to_i64("exemplar_id", id.value()))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO sentences (
                id, word_category, subcategory, icelandic_left, icelandic_right,
                english_translation, correct_answer, base_form, "case", number,
                definiteness, exemplar_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(word_category, subcategory, id) DO UPDATE SET
                icelandic_left = excluded.icelandic_left,
                icelandic_right = excluded.icelandic_right,
                english_translation = excluded.english_translation,
                correct_answer = excluded.correct_answer,
                base_form = excluded.base_form,
                "case" = excluded."case",
                number = excluded.number,
                definiteness = excluded.definiteness,
                exemplar_id = excluded.exemplar_id
            "#,
        )
        .bind(id_to_i64("item_id", record.id.value())?)
        .bind(record.word_category)
        .bind(record.subcategory)
        .bind(record.left)
        .bind(record.right)
        .bind(record.english_gloss)
        .bind(record.accepted_answer)
        .bind(record.base_form)
        .bind(record.case)
        .bind(record.number)
        .bind(record.definiteness)
        .bind(exemplar)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ItemSource for SqliteItemSource {
    async fn fetch(&self, query: &ItemQuery) -> Result<Vec<ExerciseItem>, StorageError> {
        if query.count == 0 {
            return Ok(Vec::new());
        }

        let (sql, params) = build_fetch_sql(query)?;
        let mut q = sqlx::query(&sql);
        for param in params {
            q = match param {
                Param::Int(v) => q.bind(v),
                Param::Text(v) => q.bind(v),
            };
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let items = rows
            .iter()
            .map(map_item_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            topic = %query.topic,
            requested = query.count,
            returned = items.len(),
            "fetched sentences"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{FilterCriteria, ItemId};
    use std::collections::BTreeSet;

    #[test]
    fn fetch_sql_numbers_every_placeholder() {
        let query = ItemQuery {
            topic: Topic::new("Nouns", "Cases"),
            filters: Some(FilterCriteria::default()),
            exclude_mastered: BTreeSet::from([ItemId::new(1)]),
            exclude_retry: BTreeSet::from([ItemId::new(2)]),
            count: 6,
        };
        let (sql, params) = build_fetch_sql(&query).unwrap();
        // topic(2) + excluded(2) + case/number/def(3) + exemplars(5) + limit(1)
        assert_eq!(params.len(), 13);
        assert!(sql.contains("id NOT IN (?3, ?4)"));
        assert!(sql.contains("(exemplar_id IS NULL OR exemplar_id IN (?8, ?9, ?10, ?11, ?12))"));
        assert!(sql.ends_with("LIMIT ?13"));
    }

    #[test]
    fn fetch_sql_without_filters_or_exclusions() {
        let query = ItemQuery {
            topic: Topic::new("Verbs", "Past tense"),
            filters: None,
            exclude_mastered: BTreeSet::new(),
            exclude_retry: BTreeSet::new(),
            count: 6,
        };
        let (sql, params) = build_fetch_sql(&query).unwrap();
        assert_eq!(params.len(), 3);
        assert!(!sql.contains(" IN ("));
    }
}
