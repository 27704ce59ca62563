//! Coverage-minimizing context assembly.
//!
//! Given an owner and an inclusive date range, produce a context that
//! covers every day of the range exactly once, preferring the coarsest
//! granularity available so prompts stay small.
//!
//! # Algorithm
//!
//! 1. Every monthly summary intersecting the range is included and its
//!    days are marked covered.
//! 2. A weekly summary intersecting the range is included only if none of
//!    its days are already covered. Weeks are all-or-nothing: a partially
//!    covered week is dropped rather than truncated.
//! 3. Each day in the range still uncovered contributes one raw block made
//!    of that day's chunk texts, in ascending date order. Days without
//!    chunks contribute nothing.
//! 4. Blocks are concatenated monthly, weekly, then raw, separated by a
//!    blank line.
//!
//! Summaries are assumed not to overlap within a granularity. The covered
//! set also guards against overlap within a granularity, so no day is
//! ever described twice.
//!
//! The planning step ([`plan_coverage`]) is pure; [`assemble_context`]
//! performs the storage reads around it.
//!
//! | Block | Header |
//! |-------|--------|
//! | Monthly | `Monthly summary (START to END):` |
//! | Weekly | `Weekly summary (START to END):` |
//! | Raw | `Journal entry (DATE):` |

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::error::{EngineError, Result};
use crate::models::{DateRange, Granularity, Summary};
use crate::store::JournalStore;

/// Default ceiling on the assembled context, in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 15_000;

const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Monthly,
    Weekly,
    Raw,
}

/// One unit of context. Raw blocks have `start == end`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub kind: BlockKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub text: String,
}

impl ContextBlock {
    fn from_summary(summary: &Summary) -> Self {
        let range = summary.range();
        let kind = match summary.granularity {
            Granularity::Monthly => BlockKind::Monthly,
            Granularity::Weekly => BlockKind::Weekly,
        };
        Self {
            kind,
            start: range.start,
            end: range.end,
            text: summary.text.clone(),
        }
    }

    pub fn header(&self) -> String {
        match self.kind {
            BlockKind::Monthly => format!("Monthly summary ({} to {}):", self.start, self.end),
            BlockKind::Weekly => format!("Weekly summary ({} to {}):", self.start, self.end),
            BlockKind::Raw => format!("Journal entry ({}):", self.start),
        }
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", self.header(), self.text)
    }
}

/// The assembled context and the blocks it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub text: String,
    pub blocks: Vec<ContextBlock>,
}

impl AssembledContext {
    fn from_blocks(blocks: Vec<ContextBlock>) -> Self {
        let text = blocks
            .iter()
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR);
        Self { text, blocks }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Which summaries to use and which days still need raw chunks.
#[derive(Debug, Clone, Default)]
pub struct CoveragePlan {
    pub monthly: Vec<Summary>,
    pub weekly: Vec<Summary>,
    /// Days of the range no selected summary covers, ascending.
    pub uncovered: Vec<NaiveDate>,
}

/// Select summaries coarse-to-fine so each day is covered at most once.
///
/// Summaries not intersecting `range` are ignored. Inputs are processed in
/// start-date order regardless of how they were passed in.
pub fn plan_coverage(
    range: &DateRange,
    mut monthly: Vec<Summary>,
    mut weekly: Vec<Summary>,
) -> CoveragePlan {
    monthly.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
    weekly.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

    let mut covered: HashSet<NaiveDate> = HashSet::new();
    let mut plan = CoveragePlan::default();

    for (summaries, selected) in [(monthly, &mut plan.monthly), (weekly, &mut plan.weekly)] {
        for summary in summaries {
            let interval = summary.range();
            if !interval.intersects(range) {
                continue;
            }
            if interval.days().any(|day| covered.contains(&day)) {
                tracing::debug!(
                    granularity = %summary.granularity,
                    start = %interval.start,
                    end = %interval.end,
                    "skipping summary overlapping covered days"
                );
                continue;
            }
            covered.extend(interval.days());
            selected.push(summary);
        }
    }

    plan.uncovered = range.days().filter(|day| !covered.contains(day)).collect();
    plan
}

/// Build the context for `owner` over `range`.
///
/// Returns `Ok(None)` when no block was produced at all.
///
/// # Errors
///
/// - [`EngineError::ContextTooLarge`] when the context exceeds `max_chars`
///   characters. The context is never truncated.
/// - [`EngineError::Storage`] on read failures.
pub async fn assemble_context(
    store: &dyn JournalStore,
    owner: &str,
    range: &DateRange,
    max_chars: usize,
) -> Result<Option<AssembledContext>> {
    let monthly = store
        .get_summaries_in_range(owner, Granularity::Monthly, range)
        .await?;
    let weekly = store
        .get_summaries_in_range(owner, Granularity::Weekly, range)
        .await?;
    let plan = plan_coverage(range, monthly, weekly);

    let mut blocks: Vec<ContextBlock> = plan
        .monthly
        .iter()
        .chain(plan.weekly.iter())
        .map(ContextBlock::from_summary)
        .collect();

    let raw = store.get_chunks_for_dates(owner, &plan.uncovered).await?;
    let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for (date, text) in raw {
        if range.contains(date) {
            by_date.entry(date).or_default().push(text);
        }
    }
    blocks.extend(by_date.into_iter().map(|(date, texts)| ContextBlock {
        kind: BlockKind::Raw,
        start: date,
        end: date,
        text: texts.join("\n"),
    }));

    if blocks.is_empty() {
        return Ok(None);
    }

    let assembled = AssembledContext::from_blocks(blocks);
    let chars = assembled.char_count();
    tracing::debug!(
        owner,
        monthly = plan.monthly.len(),
        weekly = plan.weekly.len(),
        blocks = assembled.blocks.len(),
        chars,
        "assembled context"
    );
    if chars > max_chars {
        return Err(EngineError::ContextTooLarge {
            chars,
            limit: max_chars,
        });
    }
    Ok(Some(assembled))
}
