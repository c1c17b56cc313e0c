//! Baseline persistence.
//!
//! Two slots are kept per monitored service:
//! - Baseline: the last accepted document, the reference for comparison
//! - Latest: the document observed by the most recent run
//!
//! ## Directory Structure
//!
//! ```text
//! {storage.dir}/
//! ├── local-api.json        # Baseline
//! ├── server-api.json       # Latest
//! └── .spec-watch.lock      # Held for the duration of a run
//! ```

pub mod local;
pub mod lock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::SpecDocument;

// Re-export for convenience
pub use local::LocalBaselineStore;
pub use lock::RunLock;

/// Summary of one stored slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotInfo {
    /// Where the slot lives (a path for local storage)
    pub location: String,
    pub fingerprint: String,
    pub title: Option<String>,
    pub version: Option<String>,
    pub operations: usize,
    pub modified: Option<DateTime<Utc>>,
}

impl SlotInfo {
    pub fn describe(location: String, doc: &SpecDocument, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            location,
            fingerprint: doc.fingerprint(),
            title: doc.title().map(String::from),
            version: doc.version().map(String::from),
            operations: doc.operation_count(),
            modified,
        }
    }
}

/// Presence and summary of both slots.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub baseline: Option<SlotInfo>,
    pub latest: Option<SlotInfo>,
}

impl StoreStatus {
    /// True when latest has been observed but differs from the baseline.
    pub fn pending_drift(&self) -> bool {
        match (&self.baseline, &self.latest) {
            (Some(b), Some(l)) => b.fingerprint != l.fingerprint,
            _ => false,
        }
    }
}

/// Trait for baseline storage backends.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// Whether a baseline has been established.
    async fn has_baseline(&self) -> Result<bool>;

    /// Load the accepted baseline; fails if absent.
    async fn load_baseline(&self) -> Result<SpecDocument>;

    /// Load the latest observed document; fails if absent.
    async fn load_latest(&self) -> Result<SpecDocument>;

    /// Persist the current run's document, replacing any prior latest.
    async fn save_latest(&self, doc: &SpecDocument) -> Result<()>;

    /// Establish the baseline from the saved latest on first run.
    ///
    /// Fails if a baseline already exists.
    async fn init_baseline(&self) -> Result<()>;

    /// Atomically make the saved latest the new baseline.
    async fn promote_latest_to_baseline(&self) -> Result<()>;

    /// Describe both slots.
    async fn status(&self) -> Result<StoreStatus>;
}
