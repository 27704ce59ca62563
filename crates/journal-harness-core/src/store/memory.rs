//! In-memory [`JournalStore`] and [`IndexStore`] implementations.
//!
//! Uses `Vec`s and `HashMap`s behind `std::sync::RwLock` for thread safety.
//! Ids are assigned from per-table counters starting at 1, mirroring an
//! autoincrement column. Intended for tests and embedding the engine
//! without a database.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::index::VectorIndex;
use crate::models::{ChatRecord, Chunk, ChunkId, DateRange, Entry, Granularity, Summary};

use super::{IndexStore, JournalStore};

#[derive(Default)]
struct Tables {
    entries: Vec<Entry>,
    chunks: Vec<Chunk>,
    summaries: Vec<Summary>,
    chat: Vec<ChatRecord>,
    next_entry_id: i64,
    next_chunk_id: i64,
    next_summary_id: i64,
}

/// In-memory relational store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn save_entry(&self, owner: &str, date: NaiveDate, text: &str) -> Result<i64> {
        let mut t = self.write()?;
        t.next_entry_id += 1;
        let id = t.next_entry_id;
        t.entries.push(Entry {
            id,
            owner: owner.to_string(),
            date,
            text: text.to_string(),
            created_at: Utc::now().timestamp(),
        });
        Ok(id)
    }

    async fn save_chunks(
        &self,
        owner: &str,
        entry_id: i64,
        date: NaiveDate,
        texts: &[String],
    ) -> Result<Vec<ChunkId>> {
        let mut t = self.write()?;
        let mut ids = Vec::with_capacity(texts.len());
        for text in texts {
            t.next_chunk_id += 1;
            let id = t.next_chunk_id;
            t.chunks.push(Chunk {
                id,
                owner: owner.to_string(),
                entry_id,
                entry_date: date,
                text: text.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_chunks(&self, owner: &str) -> Result<()> {
        self.write()?.chunks.retain(|c| c.owner != owner);
        Ok(())
    }

    async fn get_entries(&self, owner: &str) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self
            .read()?
            .entries
            .iter()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn get_entries_in_range(&self, owner: &str, range: &DateRange) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self
            .read()?
            .entries
            .iter()
            .filter(|e| e.owner == owner && range.contains(e.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn get_chunks(&self, owner: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.id);
        Ok(chunks)
    }

    async fn get_chunks_by_ids(&self, owner: &str, ids: &[ChunkId]) -> Result<Vec<String>> {
        let t = self.read()?;
        let by_id: HashMap<ChunkId, &Chunk> = t
            .chunks
            .iter()
            .filter(|c| c.owner == owner)
            .map(|c| (c.id, c))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|c| c.text.clone()))
            .collect())
    }

    async fn get_chunks_for_dates(
        &self,
        owner: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<(NaiveDate, String)>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }
        let t = self.read()?;
        let mut matched: Vec<&Chunk> = t
            .chunks
            .iter()
            .filter(|c| c.owner == owner && dates.contains(&c.entry_date))
            .collect();
        matched.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then(a.id.cmp(&b.id)));
        Ok(matched
            .into_iter()
            .map(|c| (c.entry_date, c.text.clone()))
            .collect())
    }

    async fn get_summaries_in_range(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<Vec<Summary>> {
        let mut summaries: Vec<Summary> = self
            .read()?
            .summaries
            .iter()
            .filter(|s| {
                s.owner == owner
                    && s.granularity == granularity
                    && s.start_date <= range.end
                    && s.end_date >= range.start
            })
            .cloned()
            .collect();
        summaries.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn get_summaries(&self, owner: &str, granularity: Granularity) -> Result<Vec<Summary>> {
        let mut summaries: Vec<Summary> = self
            .read()?
            .summaries
            .iter()
            .filter(|s| s.owner == owner && s.granularity == granularity)
            .cloned()
            .collect();
        summaries.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }

    async fn save_summary(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
        text: &str,
    ) -> Result<i64> {
        let mut t = self.write()?;
        t.next_summary_id += 1;
        let id = t.next_summary_id;
        t.summaries.push(Summary {
            id,
            owner: owner.to_string(),
            granularity,
            start_date: range.start,
            end_date: range.end,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn append_chat_record(&self, owner: &str, query: &str, response: &str) -> Result<()> {
        self.write()?.chat.push(ChatRecord {
            owner: owner.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn get_chat_history(&self, owner: &str) -> Result<Vec<ChatRecord>> {
        let t = self.read()?;
        Ok(t.chat
            .iter()
            .rev()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }
}

/// In-memory [`IndexStore`]. Replacing a map value is already atomic with
/// respect to readers holding the lock.
#[derive(Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<String, VectorIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> crate::error::EngineError {
    crate::error::EngineError::Storage(anyhow!("memory index store lock poisoned"))
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn load(&self, owner: &str) -> crate::error::Result<Option<VectorIndex>> {
        let map = self.indexes.read().map_err(|_| poisoned())?;
        Ok(map.get(owner).cloned())
    }

    async fn save(&self, owner: &str, index: &VectorIndex) -> crate::error::Result<()> {
        let mut map = self.indexes.write().map_err(|_| poisoned())?;
        map.insert(owner.to_string(), index.clone());
        Ok(())
    }

    async fn delete(&self, owner: &str) -> crate::error::Result<()> {
        let mut map = self.indexes.write().map_err(|_| poisoned())?;
        map.remove(owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_reads_are_owner_scoped() {
        let store = MemoryStore::new();
        let a = store.save_entry("alice", d(2024, 1, 1), "alice text").await.unwrap();
        let b = store.save_entry("bob", d(2024, 1, 1), "bob text").await.unwrap();
        let a_ids = store
            .save_chunks("alice", a, d(2024, 1, 1), &["alice text".into()])
            .await
            .unwrap();
        let b_ids = store
            .save_chunks("bob", b, d(2024, 1, 1), &["bob text".into()])
            .await
            .unwrap();

        assert_eq!(store.get_chunks("alice").await.unwrap().len(), 1);
        let texts = store
            .get_chunks_by_ids("alice", &[a_ids[0], b_ids[0]])
            .await
            .unwrap();
        assert_eq!(texts, vec!["alice text".to_string()]);
    }

    #[tokio::test]
    async fn test_chunks_by_ids_follow_request_order() {
        let store = MemoryStore::new();
        let e = store.save_entry("alice", d(2024, 1, 1), "x").await.unwrap();
        let ids = store
            .save_chunks("alice", e, d(2024, 1, 1), &["one".into(), "two".into(), "three".into()])
            .await
            .unwrap();
        let texts = store
            .get_chunks_by_ids("alice", &[ids[2], 999, ids[0]])
            .await
            .unwrap();
        assert_eq!(texts, vec!["three".to_string(), "one".to_string()]);
    }

    #[tokio::test]
    async fn test_summaries_sharing_a_start_list_newest_id_first() {
        let store = MemoryStore::new();
        let short = DateRange::new(d(2024, 3, 4), d(2024, 3, 6)).unwrap();
        let full = DateRange::new(d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        let earlier = DateRange::new(d(2024, 2, 26), d(2024, 3, 3)).unwrap();
        let first = store
            .save_summary("alice", Granularity::Weekly, &short, "first")
            .await
            .unwrap();
        let second = store
            .save_summary("alice", Granularity::Weekly, &full, "second")
            .await
            .unwrap();
        let third = store
            .save_summary("alice", Granularity::Weekly, &earlier, "third")
            .await
            .unwrap();

        let ids: Vec<i64> = store
            .get_summaries("alice", Granularity::Weekly)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second, first, third]);
    }

    #[tokio::test]
    async fn test_summaries_in_range_intersect() {
        let store = MemoryStore::new();
        let week = DateRange::new(d(2024, 1, 29), d(2024, 2, 4)).unwrap();
        let jan = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        store
            .save_summary("alice", Granularity::Weekly, &week, "w")
            .await
            .unwrap();
        store
            .save_summary("alice", Granularity::Monthly, &jan, "m")
            .await
            .unwrap();

        let feb_start = DateRange::new(d(2024, 2, 1), d(2024, 2, 3)).unwrap();
        let weekly = store
            .get_summaries_in_range("alice", Granularity::Weekly, &feb_start)
            .await
            .unwrap();
        assert_eq!(weekly.len(), 1);
        let monthly = store
            .get_summaries_in_range("alice", Granularity::Monthly, &feb_start)
            .await
            .unwrap();
        assert!(monthly.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reads() {
        let store = MemoryStore::new();
        assert!(store.get_chunks("nobody").await.unwrap().is_empty());
        assert!(store.get_chunks_for_dates("nobody", &[]).await.unwrap().is_empty());
        assert!(store.get_chat_history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_store_absent_then_present() {
        let store = MemoryIndexStore::new();
        assert!(store.load("alice").await.unwrap().is_none());
        store
            .save("alice", &VectorIndex::empty("alice", 3))
            .await
            .unwrap();
        assert!(store.load("alice").await.unwrap().is_some());
        assert!(store.load("bob").await.unwrap().is_none());
        store.delete("alice").await.unwrap();
        store.delete("alice").await.unwrap();
        assert!(store.load("alice").await.unwrap().is_none());
    }
}
