//! Query orchestration and index maintenance.
//!
//! [`Engine`] is the explicit context object every operation runs against.
//! It owns handles to storage, the index store, the embedding and
//! generative capabilities, and the intent classifier. Nothing is global.
//!
//! # Query lifecycle
//!
//! ```text
//! Received ──▶ Classified ──▶ ContextAssembled ──▶ Answered
//!                   │
//!                   └──▶ Rejected
//! ```
//!
//! - **Received**: empty queries and inverted ranges are rejected with an
//!   error before any storage or model call.
//! - **Classified**: the [`IntentClassifier`] picks the qa or summary path.
//! - **qa**: nearest chunks from the owner's vector index. A missing index
//!   or zero resolved chunks is a [`QueryOutcome::Rejected`], not an error.
//! - **summary**: coverage-minimizing assembly over the requested range.
//! - **Answered**: one generative call with a grounding prompt, then a
//!   best-effort chat record.
//!
//! External capability failures surface as typed [`EngineError`]s so the
//! caller decides between retrying and messaging the user.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::assemble::{assemble_context, DEFAULT_MAX_CONTEXT_CHARS};
use crate::chunk::ChunkingParams;
use crate::classify::{Intent, IntentClassifier};
use crate::embedding::Embedder;
use crate::error::{EngineError, Result};
use crate::generate::Generator;
use crate::index::{IndexStatus, VectorIndex};
use crate::locks::OwnerLocks;
use crate::models::{ChunkId, DateRange};
use crate::prompt::{qa_prompt, summary_prompt};
use crate::store::{IndexStore, JournalStore};

/// Separator between retrieved chunks in a qa context.
pub const QA_SEPARATOR: &str = "\n\n---\n\n";

/// Tunables for an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub chunking: ChunkingParams,
    /// Number of chunks retrieved for a qa query.
    pub top_k: usize,
    /// Ceiling on an assembled summary context, in characters.
    pub max_context_chars: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            chunking: ChunkingParams::default(),
            top_k: 5,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

/// A question asked by `owner`. Both dates are needed for the summary path.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub owner: String,
    pub query: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl QueryRequest {
    pub fn new(owner: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            query: query.into(),
            start: None,
            end: None,
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub intent: Intent,
    pub text: String,
    /// The grounding context the answer was generated from.
    pub context: String,
}

/// Why a query ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    IndexNotBuilt,
    NoRelevantInformation,
    MissingDateRange,
    NoContext,
    RangeTooLarge { chars: usize, limit: usize },
}

impl RejectReason {
    /// User-facing explanation.
    pub fn message(&self) -> String {
        match self {
            RejectReason::IndexNotBuilt => {
                "Your journal index has not been built yet. Add an entry or run `jrnl index rebuild`."
                    .to_string()
            }
            RejectReason::NoRelevantInformation => {
                "I couldn't find any relevant information in your journal entries.".to_string()
            }
            RejectReason::MissingDateRange => {
                "Please select a date range for summary queries.".to_string()
            }
            RejectReason::NoContext => {
                "No journal entries or summaries found for the selected date range.".to_string()
            }
            RejectReason::RangeTooLarge { chars, limit } => format!(
                "The selected date range is too large to summarize ({chars} characters of context, limit {limit}). Please choose a shorter range."
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Answered(Answer),
    Rejected { intent: Intent, reason: RejectReason },
}

/// Result of [`Engine::add_entry`].
#[derive(Debug, Clone, Serialize)]
pub struct AddedEntry {
    pub entry_id: i64,
    pub chunk_ids: Vec<ChunkId>,
    /// Vectors in the rebuilt index.
    pub indexed: usize,
}

/// Result of [`Engine::reindex`].
#[derive(Debug, Clone, Serialize)]
pub struct ReindexReport {
    pub entries: usize,
    pub chunks: usize,
    /// `None` when the owner has no chunks and no index was written.
    pub indexed: Option<usize>,
}

/// Context for a query that has passed classification: either the
/// grounding text or the reason to stop.
type Grounding = std::result::Result<String, RejectReason>;

pub struct Engine {
    store: Arc<dyn JournalStore>,
    indexes: Arc<dyn IndexStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    classifier: Arc<dyn IntentClassifier>,
    params: EngineParams,
    locks: OwnerLocks,
}

impl Engine {
    pub fn new(
        store: Arc<dyn JournalStore>,
        indexes: Arc<dyn IndexStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        classifier: Arc<dyn IntentClassifier>,
        params: EngineParams,
    ) -> Self {
        Self {
            store,
            indexes,
            embedder,
            generator,
            classifier,
            params,
            locks: OwnerLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn JournalStore> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Answer a query end to end.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptyQuery`] / [`EngineError::InvalidRange`] before
    ///   anything else runs.
    /// - [`EngineError::EmbeddingUnavailable`],
    ///   [`EngineError::DimensionMismatch`], or
    ///   [`EngineError::GenerationFailed`] when a capability fails.
    /// - [`EngineError::Storage`] / [`EngineError::IndexCorrupt`] on read
    ///   failures.
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let owner = request.owner.as_str();
        let query = request.query.trim();
        if query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let range = match (request.start, request.end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
            _ => None,
        };

        let intent = self.classifier.classify(query).await?;
        tracing::debug!(owner, %intent, "classified query");

        let grounding = match intent {
            Intent::Qa => self.qa_context(owner, query).await?,
            Intent::Summary => self.summary_context(owner, range.as_ref()).await?,
        };
        let context = match grounding {
            Ok(context) => context,
            Err(reason) => {
                tracing::info!(owner, %intent, ?reason, "query rejected");
                return Ok(QueryOutcome::Rejected { intent, reason });
            }
        };

        let prompt = match (intent, range.as_ref()) {
            (Intent::Summary, Some(range)) => summary_prompt(&context, query, range),
            _ => qa_prompt(&context, query),
        };
        let text = self
            .generator
            .complete(&prompt)
            .await
            .map_err(|e| {
                if e.is_external() {
                    e
                } else {
                    EngineError::GenerationFailed(e.to_string())
                }
            })?
            .trim()
            .to_string();

        if let Err(e) = self.store.append_chat_record(owner, &request.query, &text).await {
            tracing::warn!(owner, error = %e, "failed to record chat history");
        }
        tracing::info!(owner, %intent, context_chars = context.chars().count(), "answered query");

        Ok(QueryOutcome::Answered(Answer {
            intent,
            text,
            context,
        }))
    }

    async fn qa_context(&self, owner: &str, query: &str) -> Result<Grounding> {
        let index = {
            let lock = self.locks.for_owner(owner);
            let _guard = lock.read().await;
            self.indexes.load(owner).await?
        };
        let Some(index) = index else {
            return Ok(Err(RejectReason::IndexNotBuilt));
        };
        if index.owner() != owner {
            return Err(EngineError::IndexCorrupt(format!(
                "index for '{owner}' belongs to '{}'",
                index.owner()
            )));
        }

        let k = self.params.top_k.min(index.len());
        let hits = index.search(self.embedder.as_ref(), query, k).await?;
        let ids: Vec<ChunkId> = hits.iter().map(|hit| hit.chunk_id).collect();
        let texts = self.store.get_chunks_by_ids(owner, &ids).await?;
        tracing::debug!(owner, hits = hits.len(), resolved = texts.len(), "vector search");

        if texts.is_empty() {
            return Ok(Err(RejectReason::NoRelevantInformation));
        }
        Ok(Ok(texts.join(QA_SEPARATOR)))
    }

    async fn summary_context(&self, owner: &str, range: Option<&DateRange>) -> Result<Grounding> {
        let Some(range) = range else {
            return Ok(Err(RejectReason::MissingDateRange));
        };
        match assemble_context(
            self.store.as_ref(),
            owner,
            range,
            self.params.max_context_chars,
        )
        .await
        {
            Ok(Some(assembled)) => Ok(Ok(assembled.text)),
            Ok(None) => Ok(Err(RejectReason::NoContext)),
            Err(EngineError::ContextTooLarge { chars, limit }) => {
                Ok(Err(RejectReason::RangeTooLarge { chars, limit }))
            }
            Err(e) => Err(e),
        }
    }

    /// Save a new entry, chunk it, and rebuild the owner's index.
    ///
    /// Text and chunking parameters are validated before anything is
    /// written. The owner's write lock is held from the first write to the
    /// end of the rebuild, so a concurrent [`reindex`](Engine::reindex)
    /// never deletes chunks it did not see. If the rebuild fails the entry
    /// and its chunks stay saved and [`index_status`](Engine::index_status)
    /// reports them as missing.
    pub async fn add_entry(&self, owner: &str, date: NaiveDate, text: &str) -> Result<AddedEntry> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyEntry);
        }
        let windows = self.params.chunking.chunk(text)?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.write().await;

        let entry_id = self.store.save_entry(owner, date, text).await?;
        let chunk_ids = self.store.save_chunks(owner, entry_id, date, &windows).await?;
        tracing::info!(owner, entry_id, %date, chunks = chunk_ids.len(), "saved entry");

        let indexed = self.rebuild_locked(owner).await?.unwrap_or(0);
        Ok(AddedEntry {
            entry_id,
            chunk_ids,
            indexed,
        })
    }

    /// Rebuild the owner's index from every stored chunk.
    ///
    /// Holds the owner's write lock across embedding and persistence, so
    /// concurrent searches see either the previous index or the new one.
    /// Returns `None` (after removing any stale index) when the owner has
    /// no chunks.
    pub async fn rebuild_index(&self, owner: &str) -> Result<Option<usize>> {
        let lock = self.locks.for_owner(owner);
        let _guard = lock.write().await;
        self.rebuild_locked(owner).await
    }

    /// Rebuild body. The caller holds the owner's write lock.
    async fn rebuild_locked(&self, owner: &str) -> Result<Option<usize>> {
        let chunks = self.store.get_chunks(owner).await?;
        if chunks.is_empty() {
            self.indexes.delete(owner).await?;
            tracing::info!(owner, "no chunks; index removed");
            return Ok(None);
        }

        let (ids, texts): (Vec<ChunkId>, Vec<String>) =
            chunks.into_iter().map(|c| (c.id, c.text)).unzip();
        let index = VectorIndex::build(self.embedder.as_ref(), owner, &texts, &ids).await?;
        self.indexes.save(owner, &index).await?;

        tracing::info!(
            owner,
            vectors = index.len(),
            dims = index.dims(),
            model = self.embedder.model_name(),
            "rebuilt vector index"
        );
        Ok(Some(index.len()))
    }

    /// Drop every chunk, rechunk all entries with the current parameters,
    /// and rebuild the index.
    ///
    /// Runs entirely under the owner's write lock: entries added while it
    /// waits are part of the snapshot, and adds that arrive later wait for
    /// it to finish.
    pub async fn reindex(&self, owner: &str) -> Result<ReindexReport> {
        self.params.chunking.validate()?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.write().await;

        let entries = self.store.get_entries(owner).await?;

        let mut planned = Vec::with_capacity(entries.len());
        for entry in &entries {
            planned.push((entry, self.params.chunking.chunk(&entry.text)?));
        }

        self.store.delete_chunks(owner).await?;
        let mut chunks = 0;
        // Oldest first so chunk ids follow entry chronology.
        for (entry, windows) in planned.into_iter().rev() {
            if windows.is_empty() {
                continue;
            }
            let ids = self
                .store
                .save_chunks(owner, entry.id, entry.date, &windows)
                .await?;
            chunks += ids.len();
        }

        let indexed = self.rebuild_locked(owner).await?;
        tracing::info!(owner, entries = entries.len(), chunks, "reindexed journal");
        Ok(ReindexReport {
            entries: entries.len(),
            chunks,
            indexed,
        })
    }

    /// Compare the persisted index with the stored chunks. `None` when no
    /// index has been built.
    pub async fn index_status(&self, owner: &str) -> Result<Option<IndexStatus>> {
        let index = {
            let lock = self.locks.for_owner(owner);
            let _guard = lock.read().await;
            self.indexes.load(owner).await?
        };
        let Some(index) = index else {
            return Ok(None);
        };
        let current: Vec<ChunkId> = self
            .store
            .get_chunks(owner)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        Ok(Some(index.status(&current)))
    }
}
