// src/error.rs

//! Unified error handling for the drift watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for spec-watch operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetching the carrier payload failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The carrier did not contain a usable embedded document
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Reading or writing persisted state failed
    #[error("Store error: {0}")]
    Store(String),

    /// The diff engine failed to run or produced unusable output
    #[error("Diff engine error: {0}")]
    DiffEngine(String),

    /// Delivering a change report failed
    #[error("Notify error: {0}")]
    Notify(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create a fetch error.
    pub fn fetch(message: impl fmt::Display) -> Self {
        Self::Fetch(message.to_string())
    }

    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a store error with the path or slot it concerns.
    pub fn store(context: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Store(format!("{context}: {message}"))
    }

    /// Create a diff engine error.
    pub fn diff_engine(message: impl Into<String>) -> Self {
        Self::DiffEngine(message.into())
    }

    /// Create a notification error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error must abort a pipeline run.
    ///
    /// Only delivery failures are tolerated; everything else leaves the
    /// store untouched so the next scheduled run retries the comparison.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Notify(_))
    }
}
