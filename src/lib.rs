//! # Journal Harness
//!
//! A local-first journal with hierarchical retrieval and context assembly
//! for language-model answers.
//!
//! The engine itself (chunking, vector index, intent routing, coverage
//! assembly, query orchestration) lives in `journal-harness-core`. This
//! crate supplies the concrete backends and the `jrnl` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────┐   ┌─────────────┐
//! │   CLI    │──▶│   Engine (core)      │──▶│  SQLite     │
//! │  (jrnl)  │   │ classify / assemble  │   │ entries ... │
//! └──────────┘   └──────┬────────┬──────┘   └─────────────┘
//!                       │        │
//!                       ▼        ▼
//!              ┌────────────┐ ┌────────────┐
//!              │ .jvi index │ │ embedding  │
//!              │ per owner  │ │ + LLM HTTP │
//!              └────────────┘ └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | `JournalStore` over SQLite |
//! | [`index_store`] | File-backed per-owner vector index artifacts |
//! | [`http`] | Shared JSON POST with retry |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Generative model providers |
//! | [`app`] | Config-to-engine wiring |
//! | [`journal_cmd`], [`ask`], [`index_cmd`], [`summarize_cmd`], [`history`] | CLI commands |

pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod history;
pub mod http;
pub mod index_cmd;
pub mod index_store;
pub mod journal_cmd;
pub mod llm;
pub mod migrate;
pub mod sqlite_store;
pub mod summarize_cmd;
