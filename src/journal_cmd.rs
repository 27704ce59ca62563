//! `jrnl add` and `jrnl entries`.

use anyhow::{bail, Context, Result};
use std::path::Path;

use journal_harness_core::store::JournalStore;

use crate::app::{self, Needs};
use crate::config::Config;

/// Where the text of a new entry comes from.
pub enum EntrySource<'a> {
    Inline(&'a str),
    File(&'a Path),
}

/// Save an entry and rebuild the owner's index.
pub async fn run_add(
    config: &Config,
    owner: &str,
    date: Option<String>,
    source: EntrySource<'_>,
) -> Result<()> {
    let text = match source {
        EntrySource::Inline(text) => text.to_string(),
        EntrySource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read entry file: {}", path.display()))?,
    };
    if text.trim().is_empty() {
        bail!("Entry text is empty.");
    }
    let date = match date {
        Some(d) => app::parse_date(&d)?,
        None => app::today(),
    };

    let engine = app::open_engine(config, Needs::EMBEDDING).await?;
    let added = engine.add_entry(owner, date, &text).await?;

    println!("Saved entry {} for {}", added.entry_id, date);
    println!("  chunks:  {}", added.chunk_ids.len());
    println!("  indexed: {}", added.indexed);
    Ok(())
}

/// List the owner's entries, newest first.
pub async fn run_entries(
    config: &Config,
    owner: &str,
    since: Option<String>,
    until: Option<String>,
) -> Result<()> {
    let store = app::open_store(config).await?;
    let range = app::date_filter(since.as_deref(), until.as_deref())?;

    let mut entries = store.get_entries(owner).await?;
    if let Some(range) = range {
        entries.retain(|e| range.contains(e.date));
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}  #{}  {}", entry.date, entry.id, preview(&entry.text, 80));
    }
    println!();
    println!("{} entries", entries.len());
    Ok(())
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short\nsecond line", 80), "short");
        let long = "x".repeat(100);
        let p = preview(&long, 10);
        assert_eq!(p.chars().count(), 10);
        assert!(p.ends_with("..."));
    }
}
