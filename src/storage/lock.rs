//! Exclusive run lock.
//!
//! Promotion is not safe under concurrent mutation, so a run holds a lock
//! file in the storage directory from start to finish. A lock left behind by
//! a killed process is reclaimed once it is older than the configured age.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Lock file name inside the storage directory.
pub const LOCK_FILE: &str = ".spec-watch.lock";

/// Contents of the lock file.
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Guard for the storage directory; the lock is released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock in `dir`, reclaiming it if older than `stale_after`.
    pub fn acquire(dir: &Path, stale_after: Duration) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| AppError::store(dir.display(), e))?;
        let path = dir.join(LOCK_FILE);

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let age = Self::age(&path);
                if age.is_some_and(|age| age <= stale_after) {
                    return Err(held(&path));
                }
                log::warn!(
                    "Reclaiming stale lock {} (age: {:?})",
                    path.display(),
                    age
                );
                Self::reclaim(&path, stale_after)
            }
            Err(e) => Err(AppError::store(path.display(), e)),
        }
    }

    /// Move a stale lock aside and take its place.
    ///
    /// Another run may have reclaimed the lock since its age was read, so the
    /// moved file is checked again and put back if it turns out to be fresh.
    fn reclaim(path: &Path, stale_after: Duration) -> Result<Self> {
        let aside = path.with_file_name(format!("{LOCK_FILE}.{}.stale", std::process::id()));

        match fs::rename(path, &aside) {
            Ok(()) => {}
            // Already reclaimed and released by someone else
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self::create_or_held(path);
            }
            Err(e) => return Err(AppError::store(path.display(), e)),
        }

        if Self::age(&aside).is_some_and(|age| age <= stale_after) {
            if let Err(e) = fs::hard_link(&aside, path) {
                log::warn!("Failed to restore lock {}: {}", path.display(), e);
            }
            discard(&aside);
            return Err(held(path));
        }

        discard(&aside);
        Self::create_or_held(path)
    }

    fn create_or_held(path: &Path) -> Result<Self> {
        Self::create(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => held(path),
            _ => AppError::store(path.display(), e),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let body = serde_json::to_vec(&info).map_err(std::io::Error::other)?;
        file.write_all(&body)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Age of an existing lock; `None` if it cannot be determined.
    fn age(path: &Path) -> Option<Duration> {
        let recorded = fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<LockInfo>(&bytes).ok())
            .map(|info| (Utc::now() - info.acquired_at).to_std().unwrap_or_default());

        // Half-written lock files fall back to the file's mtime
        recorded.or_else(|| fs::metadata(path).ok()?.modified().ok()?.elapsed().ok())
    }
}

fn held(path: &Path) -> AppError {
    AppError::store(path.display(), "another run holds the lock")
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_acquire_and_release() {
        let tmp = TempDir::new().unwrap();
        let lock = RunLock::acquire(tmp.path(), HOUR).unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let _held = RunLock::acquire(tmp.path(), HOUR).unwrap();

        let err = RunLock::acquire(tmp.path(), HOUR).unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(err.to_string().contains("another run holds the lock"));
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let tmp = TempDir::new().unwrap();
        let stale = LockInfo {
            pid: 1,
            acquired_at: Utc::now() - chrono::Duration::hours(2),
        };
        fs::write(tmp.path().join(LOCK_FILE), serde_json::to_vec(&stale).unwrap()).unwrap();

        let lock = RunLock::acquire(tmp.path(), HOUR).unwrap();
        let info: LockInfo = serde_json::from_slice(&fs::read(lock.path()).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());
    }

    #[test]
    fn test_reclaim_leaves_no_stale_file() {
        let tmp = TempDir::new().unwrap();
        let stale = LockInfo {
            pid: 1,
            acquired_at: Utc::now() - chrono::Duration::hours(2),
        };
        fs::write(tmp.path().join(LOCK_FILE), serde_json::to_vec(&stale).unwrap()).unwrap();

        let _lock = RunLock::acquire(tmp.path(), HOUR).unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(LOCK_FILE)]);
    }

    #[test]
    fn test_reclaim_backs_off_from_fresh_lock() {
        // Another run re-took the lock between the age check and the reclaim
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let fresh = LockInfo {
            pid: 42,
            acquired_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&fresh).unwrap()).unwrap();

        let err = RunLock::reclaim(&path, HOUR).unwrap_err();
        assert!(err.to_string().contains("another run holds the lock"));

        let info: LockInfo = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(info.pid, 42);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("specs");
        let lock = RunLock::acquire(&dir, HOUR).unwrap();
        assert!(lock.path().starts_with(&dir));
    }
}
