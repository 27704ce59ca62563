//! Generative model providers.
//!
//! | Provider | Endpoint | Auth |
//! |----------|----------|------|
//! | `openai` | `POST {base_url}/chat/completions` | bearer key from `api_key_env` |
//! | `ollama` | `POST {base_url}/api/generate` | none |
//! | `disabled` | n/a | n/a |
//!
//! `openai` speaks the OpenAI chat-completions dialect, so any compatible
//! service works. With no `base_url` it targets Groq, which is why the
//! default key variable is `GROQ_API_KEY`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use journal_harness_core::error::{self, EngineError};
use journal_harness_core::generate::Generator;

use crate::config::LlmConfig;
use crate::http;

const DEFAULT_OPENAI_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

fn failed(err: anyhow::Error) -> EngineError {
    EngineError::GenerationFailed(format!("{:#}", err))
}

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _prompt: &str) -> error::Result<String> {
        Err(EngineError::GenerationFailed(
            "llm provider is disabled; set [llm].provider".to_string(),
        ))
    }
}

pub struct ChatCompletionsGenerator {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl ChatCompletionsGenerator {
    /// # Errors
    ///
    /// Fails when the key variable named by `api_key_env` is unset or empty.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{} environment variable not set", config.api_key_env))?;
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE)
            .trim_end_matches('/');

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", base),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> error::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "chat completions",
        )
        .await
        .map_err(failed)?;
        parse_chat_response(&json).map_err(failed)
    }
}

/// Text of `choices[0].message.content`.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid chat completions response: missing choices[0].message.content"))?;
    Ok(content.trim().to_string())
}

pub struct OllamaGenerator {
    model: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_BASE)
            .trim_end_matches('/');
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/api/generate", base),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> error::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await
        .map_err(failed)?;
        parse_ollama_response(&json).map_err(failed)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|r| r.trim().to_string())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
}

pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(ChatCompletionsGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_generator_fails_typed() {
        let generator = create_generator(&LlmConfig::default()).unwrap();
        let err = generator.complete("hello").await.unwrap_err();
        assert!(matches!(err, EngineError::GenerationFailed(_)));
        assert!(err.is_external());
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  You slept well.\n" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "You slept well.");
        assert!(parse_chat_response(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "model": "llama3", "response": "summary", "done": true });
        assert_eq!(parse_ollama_response(&json).unwrap(), "summary");
        assert!(parse_ollama_response(&serde_json::json!({ "done": true })).is_err());
    }

    #[test]
    fn test_openai_requires_key() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key_env: "JRNL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = create_generator(&config).err().unwrap();
        assert!(err.to_string().contains("JRNL_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_ollama_endpoint_defaults_to_localhost() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            ..LlmConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        assert_eq!(generator.endpoint, "http://localhost:11434/api/generate");
    }
}
