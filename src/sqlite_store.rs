//! SQLite-backed [`JournalStore`].
//!
//! Dates are stored as `YYYY-MM-DD` text, so range predicates compare
//! strings. Ids come from `AUTOINCREMENT` columns and are never reused,
//! which keeps chunk ids stable references for the vector index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

use journal_harness_core::models::{
    ChatRecord, Chunk, ChunkId, DateRange, Entry, Granularity, Summary,
};
use journal_harness_core::store::JournalStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .with_context(|| format!("Invalid date in database: '{}'", raw))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn entry_from_row(row: &SqliteRow) -> Result<Entry> {
    let date: String = row.get("entry_date");
    Ok(Entry {
        id: row.get("id"),
        owner: row.get("owner"),
        date: parse_date(&date)?,
        text: row.get("content"),
        created_at: row.get("created_at"),
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<Summary> {
    let granularity: String = row.get("granularity");
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");
    Ok(Summary {
        id: row.get("id"),
        owner: row.get("owner"),
        granularity: Granularity::parse(&granularity)
            .with_context(|| format!("Unknown granularity in database: '{}'", granularity))?,
        start_date: parse_date(&start)?,
        end_date: parse_date(&end)?,
        text: row.get("content"),
    })
}

#[async_trait]
impl JournalStore for SqliteStore {
    async fn save_entry(&self, owner: &str, date: NaiveDate, text: &str) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO entries (owner, entry_date, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner)
        .bind(date_to_sql(date))
        .bind(text)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn save_chunks(
        &self,
        owner: &str,
        entry_id: i64,
        date: NaiveDate,
        texts: &[String],
    ) -> Result<Vec<ChunkId>> {
        let mut tx = self.pool.begin().await?;
        let date = date_to_sql(date);
        let mut ids = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO entry_chunks (owner, entry_id, entry_date, chunk_index, text)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(owner)
            .bind(entry_id)
            .bind(&date)
            .bind(i as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn delete_chunks(&self, owner: &str) -> Result<()> {
        sqlx::query("DELETE FROM entry_chunks WHERE owner = ?")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_entries(&self, owner: &str) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, entry_date, content, created_at FROM entries
            WHERE owner = ?
            ORDER BY entry_date DESC, id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn get_entries_in_range(&self, owner: &str, range: &DateRange) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, entry_date, content, created_at FROM entries
            WHERE owner = ? AND entry_date >= ? AND entry_date <= ?
            ORDER BY entry_date ASC, id ASC
            "#,
        )
        .bind(owner)
        .bind(date_to_sql(range.start))
        .bind(date_to_sql(range.end))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn get_chunks(&self, owner: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, owner, entry_id, entry_date, text FROM entry_chunks WHERE owner = ? ORDER BY id ASC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let date: String = row.get("entry_date");
                Ok(Chunk {
                    id: row.get("id"),
                    owner: row.get("owner"),
                    entry_id: row.get("entry_id"),
                    entry_date: parse_date(&date)?,
                    text: row.get("text"),
                })
            })
            .collect()
    }

    async fn get_chunks_by_ids(&self, owner: &str, ids: &[ChunkId]) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, text FROM entry_chunks WHERE owner = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(owner);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut by_id: HashMap<i64, String> = rows
            .iter()
            .map(|row| (row.get::<i64, _>("id"), row.get::<String, _>("text")))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn get_chunks_for_dates(
        &self,
        owner: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<(NaiveDate, String)>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        // Bound by the outermost dates, then keep only requested days, so
        // long ranges never run into SQLite's bind-parameter limit.
        let wanted: HashSet<NaiveDate> = dates.iter().copied().collect();
        let (first, last) = match (wanted.iter().min(), wanted.iter().max()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(Vec::new()),
        };
        let rows = sqlx::query(
            r#"
            SELECT entry_date, text FROM entry_chunks
            WHERE owner = ? AND entry_date >= ? AND entry_date <= ?
            ORDER BY entry_date ASC, id ASC
            "#,
        )
        .bind(owner)
        .bind(date_to_sql(first))
        .bind(date_to_sql(last))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for row in &rows {
            let raw: String = row.get("entry_date");
            let date = parse_date(&raw)?;
            if wanted.contains(&date) {
                out.push((date, row.get("text")));
            }
        }
        Ok(out)
    }

    async fn get_summaries_in_range(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<Vec<Summary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, granularity, start_date, end_date, content FROM summaries
            WHERE owner = ? AND granularity = ? AND start_date <= ? AND end_date >= ?
            ORDER BY start_date ASC, id ASC
            "#,
        )
        .bind(owner)
        .bind(granularity.as_str())
        .bind(date_to_sql(range.end))
        .bind(date_to_sql(range.start))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn get_summaries(&self, owner: &str, granularity: Granularity) -> Result<Vec<Summary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, granularity, start_date, end_date, content FROM summaries
            WHERE owner = ? AND granularity = ?
            ORDER BY start_date DESC, id DESC
            "#,
        )
        .bind(owner)
        .bind(granularity.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn save_summary(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
        text: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO summaries (owner, granularity, start_date, end_date, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner)
        .bind(granularity.as_str())
        .bind(date_to_sql(range.start))
        .bind(date_to_sql(range.end))
        .bind(text)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn append_chat_record(&self, owner: &str, query: &str, response: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_history (owner, query, response, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner)
        .bind(query)
        .bind(response)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_chat_history(&self, owner: &str) -> Result<Vec<ChatRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT owner, query, response, created_at FROM chat_history
            WHERE owner = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let ts: i64 = row.get("created_at");
                Ok(ChatRecord {
                    owner: row.get("owner"),
                    query: row.get("query"),
                    response: row.get("response"),
                    timestamp: DateTime::from_timestamp(ts, 0)
                        .with_context(|| format!("Invalid timestamp in database: {}", ts))?,
                })
            })
            .collect()
    }
}
