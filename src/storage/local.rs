//! Local filesystem baseline store.
//!
//! Every write goes to a sibling `*.tmp` file which is flushed, synced and
//! then renamed over the target, so a reader (or a crashed run) only ever
//! sees the complete old file or the complete new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{SpecDocument, StorageConfig};
use crate::storage::{BaselineStore, SlotInfo, StoreStatus};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalBaselineStore {
    root_dir: PathBuf,
    baseline_file: String,
    latest_file: String,
}

impl LocalBaselineStore {
    /// Open a store rooted at `root_dir`, creating the directory if absent.
    pub async fn open(
        root_dir: impl Into<PathBuf>,
        baseline_file: impl Into<String>,
        latest_file: impl Into<String>,
    ) -> Result<Self> {
        let root_dir = root_dir.into();
        tokio::fs::create_dir_all(&root_dir)
            .await
            .map_err(|e| AppError::store(root_dir.display(), e))?;

        Ok(Self {
            root_dir,
            baseline_file: baseline_file.into(),
            latest_file: latest_file.into(),
        })
    }

    pub async fn from_config(dir: &Path, config: &StorageConfig) -> Result<Self> {
        Self::open(dir, &config.baseline_file, &config.latest_file).await
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a slot file.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, sync, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        let tmp = self.path(&format!("{key}.tmp"));
        let fail = |e: std::io::Error| AppError::store(path.display(), e);

        let mut file = tokio::fs::File::create(&tmp).await.map_err(fail)?;
        file.write_all(bytes).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;
        file.sync_all().await.map_err(fail)?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await.map_err(fail)?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::store(path.display(), e)),
        }
    }

    async fn read_document(&self, key: &str) -> Result<Option<SpecDocument>> {
        match self.read_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AppError::store(self.path(key).display(), e)),
            None => Ok(None),
        }
    }

    async fn require_document(&self, key: &str, slot: &str) -> Result<SpecDocument> {
        self.read_document(key).await?.ok_or_else(|| {
            AppError::store(self.path(key).display(), format!("no {slot} stored"))
        })
    }

    async fn modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let meta = tokio::fs::metadata(self.path(key)).await.ok()?;
        meta.modified().ok().map(DateTime::<Utc>::from)
    }

    async fn slot_info(&self, key: &str) -> Result<Option<SlotInfo>> {
        let Some(doc) = self.read_document(key).await? else {
            return Ok(None);
        };
        let location = self.path(key).display().to_string();
        Ok(Some(SlotInfo::describe(location, &doc, self.modified(key).await)))
    }

    /// Copy the latest slot over the baseline slot.
    async fn copy_latest_to_baseline(&self) -> Result<()> {
        let bytes = self.read_bytes(&self.latest_file).await?.ok_or_else(|| {
            AppError::store(self.path(&self.latest_file).display(), "no latest to promote")
        })?;

        // Never accept a latest slot that cannot be read back.
        serde_json::from_slice::<SpecDocument>(&bytes)
            .map_err(|e| AppError::store(self.path(&self.latest_file).display(), e))?;

        self.write_bytes(&self.baseline_file, &bytes).await
    }
}

#[async_trait]
impl BaselineStore for LocalBaselineStore {
    async fn has_baseline(&self) -> Result<bool> {
        match tokio::fs::metadata(self.path(&self.baseline_file)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::store(self.path(&self.baseline_file).display(), e)),
        }
    }

    async fn load_baseline(&self) -> Result<SpecDocument> {
        self.require_document(&self.baseline_file, "baseline").await
    }

    async fn load_latest(&self) -> Result<SpecDocument> {
        self.require_document(&self.latest_file, "latest").await
    }

    async fn save_latest(&self, doc: &SpecDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.write_bytes(&self.latest_file, &bytes).await?;
        log::debug!(
            "Saved latest ({}) to {}",
            doc.short_fingerprint(),
            self.path(&self.latest_file).display()
        );
        Ok(())
    }

    async fn init_baseline(&self) -> Result<()> {
        if self.has_baseline().await? {
            return Err(AppError::store(
                self.path(&self.baseline_file).display(),
                "baseline already exists",
            ));
        }
        self.copy_latest_to_baseline().await
    }

    async fn promote_latest_to_baseline(&self) -> Result<()> {
        self.copy_latest_to_baseline().await
    }

    async fn status(&self) -> Result<StoreStatus> {
        Ok(StoreStatus {
            baseline: self.slot_info(&self.baseline_file).await?,
            latest: self.slot_info(&self.latest_file).await?,
        })
    }
}
