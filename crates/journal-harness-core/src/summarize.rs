//! Weekly and monthly summary production.
//!
//! A [`Summarizer`] turns the raw entries of one period into a stored
//! [`Summary`](crate::models::Summary). Periods are calendar-aligned:
//! weeks run Monday to Sunday, months from the 1st to the last day.
//!
//! Writes are refused when the period would overlap an existing summary
//! of the same granularity, which keeps the assembler's non-overlap
//! assumption true at the source.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::generate::Generator;
use crate::models::{DateRange, Entry, Granularity};
use crate::prompt::{monthly_summary_prompt, weekly_summary_prompt};
use crate::store::JournalStore;

/// The Monday-to-Sunday week before the week containing `date`.
pub fn previous_week(date: NaiveDate) -> DateRange {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    DateRange {
        start: monday - Duration::days(7),
        end: monday - Duration::days(1),
    }
}

/// The calendar month before the month containing `date`.
pub fn previous_month(date: NaiveDate) -> DateRange {
    let end = date - Duration::days(date.day0() as i64 + 1);
    DateRange {
        start: end - Duration::days(end.day0() as i64),
        end,
    }
}

/// The period of `granularity` preceding `date`.
pub fn previous_period(granularity: Granularity, date: NaiveDate) -> DateRange {
    match granularity {
        Granularity::Weekly => previous_week(date),
        Granularity::Monthly => previous_month(date),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummarizeOutcome {
    Saved { id: i64, range: DateRange, chars: usize },
    /// No entries were written in the period.
    NoEntries { range: DateRange },
    /// An existing summary of the same granularity overlaps the period.
    AlreadyCovered { range: DateRange, existing: DateRange },
}

pub struct Summarizer {
    store: Arc<dyn JournalStore>,
    generator: Arc<dyn Generator>,
}

fn format_entries(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| format!("Date: {}\n{}", e.date, e.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Summarizer {
    pub fn new(store: Arc<dyn JournalStore>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    /// Summarize `owner`'s entries in `range` at `granularity`.
    ///
    /// The overlap check runs before the model is called.
    pub async fn run(
        &self,
        owner: &str,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<SummarizeOutcome> {
        let existing = self
            .store
            .get_summaries_in_range(owner, granularity, range)
            .await?;
        if let Some(first) = existing.first() {
            tracing::info!(owner, %granularity, %range, existing = %first.range(), "period already summarized");
            return Ok(SummarizeOutcome::AlreadyCovered {
                range: *range,
                existing: first.range(),
            });
        }

        let entries = self.store.get_entries_in_range(owner, range).await?;
        if entries.is_empty() {
            return Ok(SummarizeOutcome::NoEntries { range: *range });
        }

        let body = format_entries(&entries);
        let prompt = match granularity {
            Granularity::Weekly => weekly_summary_prompt(range, &body),
            Granularity::Monthly => monthly_summary_prompt(range, &body),
        };
        let text = self.generator.complete(&prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::GenerationFailed(
                "model returned an empty summary".to_string(),
            ));
        }

        let id = self.store.save_summary(owner, granularity, range, text).await?;
        let chars = text.chars().count();
        tracing::info!(owner, %granularity, %range, entries = entries.len(), chars, "saved summary");
        Ok(SummarizeOutcome::Saved {
            id,
            range: *range,
            chars,
        })
    }
}
