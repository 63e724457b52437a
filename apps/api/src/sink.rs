//! Batch sink: durable, append-only storage for accepted prompts.
//!
//! Rows land in a collection named after the current UTC date. A new collection
//! starts with a header row at index 0. A batch is written in one transaction:
//! either every row is appended or none is.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;

/// Header row written when a collection is created.
pub const HEADER: &str = "Prompt";

/// Where finished batches go. Carried in `AppState` as `Arc<dyn PromptSink>`.
#[async_trait]
pub trait PromptSink: Send + Sync {
    /// Appends `rows` in order to `collection`, creating it if needed.
    async fn append_rows(&self, collection: &str, rows: &[String]) -> Result<(), AppError>;
}

/// Collection name for a given day, e.g. `2026-10-16`.
pub fn collection_for(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Collection name for today (UTC).
pub fn todays_collection() -> String {
    collection_for(Utc::now().date_naive())
}

/// PostgreSQL-backed sink: one `prompt_sheets` row per collection, one
/// `prompt_rows` row per prompt.
#[derive(Clone)]
pub struct PgSheetSink {
    pool: PgPool,
}

impl PgSheetSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One row to insert, at its final position in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow<'a> {
    pub index: i32,
    pub text: &'a str,
}

/// Lays out the rows of one append.
///
/// A freshly created collection gets the header at index 0. Data rows follow
/// `last_index` (the highest index already stored) without gaps. Fails before
/// anything is written when an index would not fit the column.
pub fn plan_rows<'a>(
    created: bool,
    last_index: Option<i32>,
    rows: &'a [String],
) -> Result<Vec<PlannedRow<'a>>, AppError> {
    let mut planned = Vec::with_capacity(rows.len() + usize::from(created));
    if created {
        planned.push(PlannedRow {
            index: 0,
            text: HEADER,
        });
    }

    let last = if created { 0 } else { last_index.unwrap_or(0) };
    for (offset, text) in rows.iter().enumerate() {
        let index = i32::try_from(offset)
            .ok()
            .and_then(|offset| last.checked_add(offset))
            .and_then(|index| index.checked_add(1))
            .ok_or_else(|| anyhow!("Row index overflow after row {last} (offset {offset})"))?;
        planned.push(PlannedRow { index, text });
    }

    Ok(planned)
}

#[async_trait]
impl PromptSink for PgSheetSink {
    async fn append_rows(&self, collection: &str, rows: &[String]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO prompt_sheets (name, header)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(HEADER)
        .execute(&mut *tx)
        .await?;
        let created = inserted.rows_affected() == 1;

        // Serialises concurrent appends to the same collection.
        sqlx::query("SELECT name FROM prompt_sheets WHERE name = $1 FOR UPDATE")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        let last_index: Option<i32> =
            sqlx::query_scalar("SELECT MAX(row_index) FROM prompt_rows WHERE sheet_name = $1")
                .bind(collection)
                .fetch_one(&mut *tx)
                .await?;

        // Dropping `tx` on an early return rolls the whole append back.
        for row in plan_rows(created, last_index, rows)? {
            sqlx::query(
                r#"
                INSERT INTO prompt_rows (sheet_name, row_index, text)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(collection)
            .bind(row.index)
            .bind(row.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if created {
            info!("Created collection {collection}");
        }
        info!("Appended {} rows to collection {collection}", rows.len());
        Ok(())
    }
}
