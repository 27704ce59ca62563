//! Generative model contract.
//!
//! The engine hands a fully built prompt to a [`Generator`] and receives
//! the model's text. Failures come back through the error channel as
//! [`EngineError::GenerationFailed`](crate::error::EngineError::GenerationFailed),
//! never as answer text, so callers decide between retry and messaging.
//!
//! HTTP-backed implementations live in the `journal-harness` app crate.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.1-8b-instant"`).
    fn model_name(&self) -> &str;
    /// Run one completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
