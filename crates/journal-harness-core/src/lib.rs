//! # Journal Harness Core
//!
//! The retrieval and context-assembly engine behind Journal Harness:
//! data models, chunking, the embedding and generation contracts, the
//! per-owner vector index, store abstractions, intent classification,
//! coverage-minimizing context assembly, and query orchestration.
//!
//! This crate performs no SQL, HTTP, or filesystem I/O. Concrete stores
//! and model providers are supplied by the `journal-harness` app crate
//! through the traits in [`store`], [`embedding`], and [`generate`].
//!
//! # Example
//!
//! ```rust
//! use journal_harness_core::assemble::plan_coverage;
//! use journal_harness_core::models::DateRange;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
//! let plan = plan_coverage(&DateRange::single(day), Vec::new(), Vec::new());
//! assert_eq!(plan.uncovered, vec![day]);
//! ```

pub mod assemble;
pub mod chunk;
pub mod classify;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generate;
pub mod index;
pub mod locks;
pub mod models;
pub mod prompt;
pub mod store;
pub mod summarize;
