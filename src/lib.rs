//! Novel Importer Core Library
//!
//! Imports web novels from arbitrary sites using declarative parser rules:
//! a novel's landing page yields metadata and a chapter list, then each
//! chapter is fetched, cleaned and stored in order.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`network`] - Request gate, connectivity checks, transport and error classification
//! - [`rules`] - Parser rule model, persistence, matching and default seed
//! - [`extract`] - Metadata, chapter list and content extraction from HTML
//! - [`store`] - Novel and chapter records
//! - [`import`] - Download orchestrator with resume and cancellation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod db;
pub mod extract;
pub mod import;
pub mod network;
pub mod rules;
pub mod store;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use extract::{ChapterInfo, ExtractionService, NovelMetadata, clean_content};
pub use import::{
    DownloadOrchestrator, EngineConfig, ImportError, ImportOutcome, ImportState, NoProgress,
    ProgressReporter, ProgressUpdate,
};
pub use network::{Dispatcher, NetworkError, RequestGate, Transport};
pub use rules::{ParserRule, RuleError, RuleStore, RuleTestReport, seed_default_rules, test_rule};
pub use store::{NovelStore, SqliteNovelStore, StoreError, check_existing_novel};
