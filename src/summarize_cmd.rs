//! `jrnl summarize` and `jrnl summaries`.
//!
//! `summarize weekly` covers the Monday-to-Sunday week before the week
//! containing `--date`; `summarize monthly` the calendar month before
//! `--date`'s month. `--date` defaults to today, so a scheduled run on
//! Monday (weekly) or the 1st (monthly) summarizes the period just ended.

use anyhow::Result;
use std::sync::Arc;

use journal_harness_core::models::Granularity;
use journal_harness_core::store::JournalStore;
use journal_harness_core::summarize::{previous_period, SummarizeOutcome, Summarizer};

use crate::app::{self, Needs};
use crate::config::Config;
use crate::llm;

pub async fn run_summarize(
    config: &Config,
    owner: &str,
    granularity: Granularity,
    date: Option<String>,
) -> Result<()> {
    app::require(config, Needs::LLM)?;
    let date = match date {
        Some(d) => app::parse_date(&d)?,
        None => app::today(),
    };
    let range = previous_period(granularity, date);

    let generator = llm::create_generator(&config.llm)?;
    let store: Arc<dyn JournalStore> = app::open_store(config).await?;
    let summarizer = Summarizer::new(store, generator);

    match summarizer.run(owner, granularity, &range).await? {
        SummarizeOutcome::Saved { id, range, chars } => {
            println!("Saved {} summary {} for {} ({} chars)", granularity, id, range, chars);
        }
        SummarizeOutcome::NoEntries { range } => {
            println!("No entries for {}; nothing to summarize.", range);
        }
        SummarizeOutcome::AlreadyCovered { range, existing } => {
            println!(
                "A {} summary for {} already exists; skipping {}.",
                granularity, existing, range
            );
        }
    }
    Ok(())
}

pub async fn run_summaries(
    config: &Config,
    owner: &str,
    granularity: Option<Granularity>,
) -> Result<()> {
    let store = app::open_store(config).await?;
    let granularities = match granularity {
        Some(g) => vec![g],
        None => vec![Granularity::Monthly, Granularity::Weekly],
    };

    let mut total = 0;
    for granularity in granularities {
        let summaries = store.get_summaries(owner, granularity).await?;
        if summaries.is_empty() {
            continue;
        }
        println!("{} summaries", granularity);
        for summary in &summaries {
            println!("  #{}  {}", summary.id, summary.range());
            for line in summary.text.lines().filter(|l| !l.trim().is_empty()) {
                println!("      {}", line.trim());
            }
        }
        println!();
        total += summaries.len();
    }

    if total == 0 {
        println!("No summaries.");
    }
    Ok(())
}
