//! `jrnl history`: past questions and answers, newest first.
//!
//! Records can be narrowed to a range of days (by their UTC timestamp) and
//! to those whose question or answer contains a keyword, ignoring case.

use anyhow::Result;

use journal_harness_core::models::{ChatRecord, DateRange};
use journal_harness_core::store::JournalStore;

use crate::app;
use crate::config::Config;

/// Filters applied to `jrnl history`.
#[derive(Debug, Default)]
pub struct HistoryFilter {
    pub range: Option<DateRange>,
    /// Lowercased keyword.
    pub keyword: Option<String>,
}

impl HistoryFilter {
    pub fn new(range: Option<DateRange>, keyword: Option<&str>) -> Self {
        let keyword = keyword
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        Self { range, keyword }
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none() && self.keyword.is_none()
    }

    pub fn matches(&self, record: &ChatRecord) -> bool {
        if let Some(range) = &self.range {
            if !range.contains(record.timestamp.date_naive()) {
                return false;
            }
        }
        match &self.keyword {
            Some(keyword) => {
                record.query.to_lowercase().contains(keyword)
                    || record.response.to_lowercase().contains(keyword)
            }
            None => true,
        }
    }
}

pub async fn run_history(
    config: &Config,
    owner: &str,
    limit: usize,
    since: Option<String>,
    until: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let range = app::date_filter(since.as_deref(), until.as_deref())?;
    let filter = HistoryFilter::new(range, search.as_deref());

    let store = app::open_store(config).await?;
    let records = store.get_chat_history(owner).await?;
    if records.is_empty() {
        println!("No chat history.");
        return Ok(());
    }

    let matching: Vec<&ChatRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    if matching.is_empty() {
        println!("No matching chat history.");
        return Ok(());
    }

    for record in matching.iter().take(limit) {
        println!("[{}]", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("Q: {}", record.query);
        println!("A: {}", record.response);
        println!();
    }
    if !filter.is_empty() {
        println!("{} of {} records match", matching.len(), records.len());
    }
    Ok(())
}
