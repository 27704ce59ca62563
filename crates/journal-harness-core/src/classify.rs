//! Query intent routing.
//!
//! A query is either a fact lookup ([`Intent::Qa`]) answered from the
//! nearest chunks, or a pattern/trend request ([`Intent::Summary`]) answered
//! from the summary hierarchy. Classification is a pluggable strategy:
//!
//! - [`ModelClassifier`] asks the generative model and looks for the word
//!   "summary" in its reply. Its output can change across model versions
//!   and is treated as best effort.
//! - [`KeywordClassifier`] is a deterministic vocabulary heuristic, useful
//!   offline and in tests.
//!
//! Anything ambiguous falls back to [`Intent::Qa`].

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::generate::Generator;
use crate::prompt::classification_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Qa,
    Summary,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Qa => f.write_str("qa"),
            Intent::Summary => f.write_str("summary"),
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Intent>;
}

/// Map a free-form model reply onto an [`Intent`].
pub fn parse_intent(response: &str) -> Intent {
    if response.to_lowercase().contains("summary") {
        Intent::Summary
    } else {
        Intent::Qa
    }
}

/// Uses the generative model as an oracle.
pub struct ModelClassifier {
    generator: Arc<dyn Generator>,
}

impl ModelClassifier {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl IntentClassifier for ModelClassifier {
    async fn classify(&self, query: &str) -> Result<Intent> {
        let response = self.generator.complete(&classification_prompt(query)).await?;
        let intent = parse_intent(response.trim());
        tracing::debug!(%intent, raw = %response.trim(), "model classification");
        Ok(intent)
    }
}

const SUMMARY_CUES: &[&str] = &[
    "summary",
    "summarize",
    "summarise",
    "overview",
    "overall",
    "pattern",
    "trend",
    "theme",
    "recurring",
    "generally",
    "usually",
    "how was my",
    "how have i",
    "how did i feel",
    "mood",
    "focused on",
    "last week",
    "last month",
    "this month",
    "this week",
];

/// Deterministic vocabulary heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify_sync(&self, query: &str) -> Intent {
        let lower = query.to_lowercase();
        if SUMMARY_CUES.iter().any(|cue| lower.contains(cue)) {
            Intent::Summary
        } else {
            Intent::Qa
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> Result<Intent> {
        Ok(self.classify_sync(query))
    }
}
