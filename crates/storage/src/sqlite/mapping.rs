use drill_core::model::{ExemplarId, ExerciseItem, ItemId};
use sqlx::Row;

use crate::repository::{ItemRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExerciseItem, StorageError> {
    let exemplar = row
        .try_get::<Option<i64>, _>("exemplar_id")
        .map_err(ser)?
        .map(|v| i64_to_u64("exemplar_id", v).map(ExemplarId::new))
        .transpose()?;

    let record = ItemRecord {
        id: ItemId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        word_category: row.try_get("word_category").map_err(ser)?,
        subcategory: row.try_get("subcategory").map_err(ser)?,
        left: row.try_get("icelandic_left").map_err(ser)?,
        right: row.try_get("icelandic_right").map_err(ser)?,
        english_gloss: row.try_get("english_translation").map_err(ser)?,
        accepted_answer: row.try_get("correct_answer").map_err(ser)?,
        base_form: row.try_get("base_form").map_err(ser)?,
        case: row.try_get("case").map_err(ser)?,
        number: row.try_get("number").map_err(ser)?,
        definiteness: row.try_get("definiteness").map_err(ser)?,
        exemplar,
    };

    Ok(record.into_item()?)
}
