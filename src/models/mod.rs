// src/models/mod.rs

//! Domain models for the drift watcher.
//!
//! This module contains the data structures shared across the pipeline,
//! organized by their primary purpose.

mod config;
mod document;
mod report;

// Re-export all public types
pub use config::{
    Config, DiffConfig, ENV_DIFF_TIMEOUT, ENV_SOURCE_URL, ENV_STORAGE_DIR, ENV_WEBHOOK_URL,
    LoggingConfig, NotifyConfig, SourceConfig, StorageConfig,
};
pub use document::SpecDocument;
pub use report::{ChangeReport, DiffResult, RunOutcome, RunReport};
