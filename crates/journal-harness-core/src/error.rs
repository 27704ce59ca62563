//! Typed error channel for the engine.
//!
//! Validation problems, external capability failures, and storage failures
//! are kept distinct so callers can decide between retrying, re-prompting
//! the user, or aborting. "Nothing found" conditions are never errors; they
//! surface as `Option::None`, empty vectors, or a rejected
//! [`QueryOutcome`](crate::engine::QueryOutcome).

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("entry text must not be empty")]
    EmptyEntry,

    #[error("invalid chunking parameters: overlap {overlap} must be smaller than window size {window_size}")]
    InvalidChunking { window_size: usize, overlap: usize },

    #[error("{texts} chunk texts but {ids} chunk ids")]
    LengthMismatch { texts: usize, ids: usize },

    #[error("embedding capability unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("generative model call failed: {0}")]
    GenerationFailed(String),

    #[error("context of {chars} characters exceeds the limit of {limit}")]
    ContextTooLarge { chars: usize, limit: usize },

    #[error("vector index artifact is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// True for errors raised before any external call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidRange { .. }
                | EngineError::EmptyQuery
                | EngineError::EmptyEntry
                | EngineError::InvalidChunking { .. }
                | EngineError::LengthMismatch { .. }
                | EngineError::ContextTooLarge { .. }
        )
    }

    /// True when the embedding or generative capability failed.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            EngineError::EmbeddingUnavailable(_)
                | EngineError::DimensionMismatch { .. }
                | EngineError::GenerationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
