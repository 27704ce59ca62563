//! Storage abstraction for Journal Harness.
//!
//! Two traits separate the relational data from the vector index artifact:
//!
//! - [`JournalStore`]: entries, chunks, summaries, and chat records.
//! - [`IndexStore`]: one persisted [`VectorIndex`] per owner, keyed by
//!   owner id, behind a load/save/delete contract that does not care
//!   whether the backing is a file, an object store, or memory.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Every read returns an empty `Vec` (never an error) when nothing matches.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::index::VectorIndex;
use crate::models::{ChatRecord, Chunk, ChunkId, DateRange, Entry, Granularity, Summary};

/// Abstract relational backend for one or more owners.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save_entry`](JournalStore::save_entry) | Persist a new entry, returning its id |
/// | [`save_chunks`](JournalStore::save_chunks) | Persist an entry's chunk texts in order |
/// | [`delete_chunks`](JournalStore::delete_chunks) | Drop every chunk an owner has |
/// | [`get_chunks`](JournalStore::get_chunks) | All chunks of an owner, id order |
/// | [`get_chunks_by_ids`](JournalStore::get_chunks_by_ids) | Resolve chunk texts |
/// | [`get_chunks_for_dates`](JournalStore::get_chunks_for_dates) | Raw chunks for specific days |
/// | [`get_summaries_in_range`](JournalStore::get_summaries_in_range) | Summaries intersecting a range |
/// | [`save_summary`](JournalStore::save_summary) | Persist a produced summary |
/// | [`append_chat_record`](JournalStore::append_chat_record) | Write-once audit log |
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn save_entry(&self, owner: &str, date: NaiveDate, text: &str) -> Result<i64>;

    /// Insert `texts` as chunks of `entry_id`; returns their ids in order.
    async fn save_chunks(
        &self,
        owner: &str,
        entry_id: i64,
        date: NaiveDate,
        texts: &[String],
    ) -> Result<Vec<ChunkId>>;

    /// Remove all chunks of `owner`. Used before a full rechunk.
    async fn delete_chunks(&self, owner: &str) -> Result<()>;

    /// All entries, newest date first.
    async fn get_entries(&self, owner: &str) -> Result<Vec<Entry>>;

    /// Entries dated within `range`, oldest first.
    async fn get_entries_in_range(&self, owner: &str, range: &DateRange) -> Result<Vec<Entry>>;

    /// All chunks, ascending by id.
    async fn get_chunks(&self, owner: &str) -> Result<Vec<Chunk>>;

    /// Texts of the chunks in `ids`, in the order of `ids`. Unknown ids and
    /// ids belonging to other owners are skipped.
    async fn get_chunks_by_ids(&self, owner: &str, ids: &[ChunkId]) -> Result<Vec<String>>;

    /// `(date, text)` pairs for chunks dated on any of `dates`, ordered by
    /// date then chunk id.
    async fn get_chunks_for_dates(
        &self,
        owner: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<(NaiveDate, String)>>;

    /// Summaries of `granularity` whose interval intersects `range`,
    /// ordered by start date.
    async fn get_summaries_in_range(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<Vec<Summary>>;

    /// All summaries of `granularity`, newest first.
    async fn get_summaries(&self, owner: &str, granularity: Granularity) -> Result<Vec<Summary>>;

    async fn save_summary(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
        text: &str,
    ) -> Result<i64>;

    async fn append_chat_record(&self, owner: &str, query: &str, response: &str) -> Result<()>;

    /// Chat records, newest first.
    async fn get_chat_history(&self, owner: &str) -> Result<Vec<ChatRecord>>;
}

/// Keyed store of per-owner vector index artifacts.
///
/// `save` must replace the previous artifact atomically: a concurrent
/// `load` sees either the old index or the new one, never a partial write.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Returns `None` when no index has been built for `owner` yet.
    async fn load(&self, owner: &str) -> crate::error::Result<Option<VectorIndex>>;

    async fn save(&self, owner: &str, index: &VectorIndex) -> crate::error::Result<()>;

    /// Removing a missing index is not an error.
    async fn delete(&self, owner: &str) -> crate::error::Result<()>;
}
