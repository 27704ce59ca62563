//! Wiring from [`Config`] to a ready [`Engine`].
//!
//! Commands call [`open_engine`] with the capabilities they need. A
//! command that needs a disabled capability fails here, before touching
//! the database, with a message naming the config section to change.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::sync::Arc;

use journal_harness_core::classify::{IntentClassifier, KeywordClassifier, ModelClassifier};
use journal_harness_core::engine::Engine;
use journal_harness_core::models::DateRange;
use journal_harness_core::store::JournalStore;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::index_store::FileIndexStore;
use crate::llm;
use crate::sqlite_store::SqliteStore;

/// Capabilities a command relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Needs {
    pub embedding: bool,
    pub llm: bool,
}

impl Needs {
    pub const NONE: Needs = Needs {
        embedding: false,
        llm: false,
    };
    pub const EMBEDDING: Needs = Needs {
        embedding: true,
        llm: false,
    };
    pub const LLM: Needs = Needs {
        embedding: false,
        llm: true,
    };
}

/// Bail unless every capability in `needs` is configured.
pub fn require(config: &Config, needs: Needs) -> Result<()> {
    if needs.embedding && !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    if needs.llm && !config.llm.is_enabled() {
        bail!("LLM provider is disabled. Set [llm] provider in config.");
    }
    Ok(())
}

/// Open the SQLite store. The database must have been created by `jrnl init`.
pub async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    if !config.db.path.exists() {
        bail!(
            "Database not found at {}. Run `jrnl init` first.",
            config.db.path.display()
        );
    }
    let pool = db::connect(config).await?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

pub async fn open_engine(config: &Config, needs: Needs) -> Result<Engine> {
    require(config, needs)?;

    let embedder = embedding::create_provider(&config.embedding)
        .context("Failed to create embedding provider")?;
    let generator =
        llm::create_generator(&config.llm).context("Failed to create llm provider")?;

    let classifier: Arc<dyn IntentClassifier> = match config.classifier.mode.as_str() {
        "keyword" => Arc::new(KeywordClassifier),
        _ => Arc::new(ModelClassifier::new(Arc::clone(&generator))),
    };

    let store: Arc<dyn JournalStore> = open_store(config).await?;
    let indexes = Arc::new(FileIndexStore::new(&config.index.dir));

    Ok(Engine::new(
        store,
        indexes,
        embedder,
        generator,
        classifier,
        config.engine_params(),
    ))
}

/// The owner commands act for: `--user`, else `$USER`, else `default`.
pub fn resolve_owner(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("USER").ok())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", value))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The inclusive range named by optional `--since`/`--until` flags, or
/// `None` when neither is given. An open side extends to the calendar's end.
pub fn date_filter(since: Option<&str>, until: Option<&str>) -> Result<Option<DateRange>> {
    let since = since.map(parse_date).transpose()?;
    let until = until.map(parse_date).transpose()?;
    match (since, until) {
        (None, None) => Ok(None),
        (start, end) => Ok(Some(DateRange::new(
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_owner_prefers_flag() {
        assert_eq!(resolve_owner(Some(" alice ".to_string())), "alice");
        assert!(!resolve_owner(None).is_empty());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-09").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        let err = parse_date("09/03/2024").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_date_filter() {
        assert!(date_filter(None, None).unwrap().is_none());
        let range = date_filter(Some("2024-03-10"), None).unwrap().unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2999, 1, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
        assert!(date_filter(Some("2024-03-10"), Some("2024-03-01")).is_err());
    }

    #[test]
    fn test_require_names_missing_capability() {
        let config: Config = toml::from_str(
            "[db]\npath = \"/tmp/x.sqlite\"\n[index]\ndir = \"/tmp/idx\"\n",
        )
        .unwrap();
        require(&config, Needs::NONE).unwrap();
        let err = require(&config, Needs::EMBEDDING).unwrap_err();
        assert!(err.to_string().contains("[embedding]"));
        let err = require(&config, Needs::LLM).unwrap_err();
        assert!(err.to_string().contains("[llm]"));
    }
}
