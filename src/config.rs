//! TOML configuration.
//!
//! Every section except `[db]` and `[index]` has defaults, so a minimal
//! config only names where data lives:
//!
//! ```toml
//! [db]
//! path = "./data/journal.sqlite"
//!
//! [index]
//! dir = "./data/indexes"
//! ```
//!
//! [`load_config`] validates the file at startup. An invalid config is
//! fatal; nothing runs against a half-valid configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use journal_harness_core::chunk::ChunkingParams;
use journal_harness_core::engine::EngineParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingParams,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding one `<owner>.jvi` artifact per owner.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_context_chars() -> usize {
    15_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// `model` asks the LLM; `keyword` uses a fixed vocabulary.
    #[serde(default = "default_classifier_mode")]
    pub mode: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: default_classifier_mode(),
        }
    }
}

fn default_classifier_mode() -> String {
    "model".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// OpenAI-compatible API root (`openai`) or Ollama URL (`ollama`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key for `openai`.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_llm_timeout_secs() -> u64 {
    120
}

impl Config {
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            chunking: self.chunking,
            top_k: self.retrieval.top_k,
            max_context_chars: self.retrieval.max_context_chars,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.window_size == 0 {
        anyhow::bail!("chunking.window_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.window_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.window_size ({})",
            config.chunking.overlap,
            config.chunking.window_size
        );
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_context_chars < 1 {
        anyhow::bail!("retrieval.max_context_chars must be >= 1");
    }

    match config.classifier.mode.as_str() {
        "model" | "keyword" => {}
        other => anyhow::bail!(
            "Unknown classifier mode: '{}'. Must be model or keyword.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.unwrap_or(0) == 0 {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.llm.is_enabled() && config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty when provider is '{}'", config.llm.provider);
    }

    Ok(())
}
