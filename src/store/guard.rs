//! Per-record guard files for the file store.
//!
//! A guard serialises one record's read-compare-write across processes.
//! It is created with `create_new` semantics (exclusive create), so only
//! one caller can hold it, and removed when the [`RecordGuard`] is dropped.
//!
//! # Guard Metadata
//!
//! Each guard file contains JSON metadata:
//! - `owner`: `user@HOST` of the process holding it
//! - `pid`: process ID
//! - `created_at`: RFC3339 timestamp
//! - `action`: the update being performed
//!
//! A guard older than the stale threshold belongs to a process that died
//! mid-update and is removed by the next caller.

use crate::error::{BatonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Metadata stored in guard files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardMetadata {
    /// Owner of the guard (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the guard holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the guard was created.
    pub created_at: DateTime<Utc>,

    /// The update being performed.
    pub action: String,
}

impl GuardMetadata {
    /// Create new guard metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Parse guard metadata from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to read guard file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to parse guard file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Age of the guard.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Whether the guard is older than `stale_after`.
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.age()
            .to_std()
            .map(|age| age > stale_after)
            .unwrap_or(false)
    }
}

/// Get the owner string for guard metadata.
fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// RAII guard for a record guard file.
///
/// When dropped, the guard file is deleted. If deletion fails, a warning
/// is logged but no panic occurs.
#[derive(Debug)]
pub struct RecordGuard {
    path: PathBuf,
    released: bool,
}

impl RecordGuard {
    /// Release the guard, reporting a failed removal.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to release guard '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.path)
        {
            warn!(path = %self.path.display(), error = %e, "failed to release record guard");
        }
    }
}

/// How the guard is acquired.
#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy {
    /// Guards older than this are removed as abandoned.
    pub stale_after: Duration,
    /// Give up with `StoreBusy` after waiting this long.
    pub wait: Duration,
}

/// Acquire the guard at `path`, waiting up to `policy.wait` for a live
/// holder to finish.
pub fn acquire_guard(path: &Path, action: &str, policy: GuardPolicy) -> Result<RecordGuard> {
    let deadline = Instant::now() + policy.wait;
    let mut backoff = Duration::from_millis(1);

    loop {
        match try_create(path, &GuardMetadata::new(action))? {
            Some(guard) => return Ok(guard),
            None => {
                if is_abandoned(path, policy.stale_after) {
                    warn!(path = %path.display(), "removing abandoned record guard");
                    match fs::remove_file(path) {
                        Ok(()) => continue,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(e) => {
                            return Err(BatonError::StoreError(format!(
                                "failed to remove abandoned guard '{}': {}",
                                path.display(),
                                e
                            )));
                        }
                    }
                }

                if Instant::now() >= deadline {
                    let holder = GuardMetadata::from_file(path)
                        .map(|meta| format!(" (held by {} for {})", meta.owner, meta.action))
                        .unwrap_or_default();
                    return Err(BatonError::StoreBusy(format!(
                        "record guard '{}' still held after {} ms{}",
                        path.display(),
                        policy.wait.as_millis(),
                        holder
                    )));
                }

                debug!(path = %path.display(), ?backoff, "record guard held, waiting");
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(Duration::from_millis(16));
            }
        }
    }
}

/// Try to create the guard file. `Ok(None)` means someone else holds it.
fn try_create(path: &Path, metadata: &GuardMetadata) -> Result<Option<RecordGuard>> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(BatonError::StoreError(format!(
                "failed to create guard '{}': {}",
                path.display(),
                e
            )));
        }
    };

    // From here on the guard is ours; dropping it removes the file.
    let guard = RecordGuard {
        path: path.to_path_buf(),
        released: false,
    };

    let json = serde_json::to_string(metadata)
        .map_err(|e| BatonError::StoreError(format!("failed to serialize guard metadata: {}", e)))?;
    file.write_all(json.as_bytes())
        .map_err(|e| BatonError::StoreError(format!("failed to write guard metadata: {}", e)))?;

    Ok(Some(guard))
}

/// A guard is abandoned when its metadata says it is stale, or when the
/// metadata is unreadable and the file itself is older than the threshold.
fn is_abandoned(path: &Path, stale_after: Duration) -> bool {
    if let Ok(meta) = GuardMetadata::from_file(path) {
        return meta.is_stale(stale_after);
    }

    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > stale_after)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn policy(wait_ms: u64) -> GuardPolicy {
        GuardPolicy {
            stale_after: Duration::from_secs(30),
            wait: Duration::from_millis(wait_ms),
        }
    }

    #[test]
    fn test_guard_metadata_creation() {
        let meta = GuardMetadata::new("acquire");

        assert!(meta.owner.contains('@'));
        assert!(meta.pid.is_some());
        assert_eq!(meta.action, "acquire");
        assert!(!meta.is_stale(Duration::from_secs(30)));
    }

    #[test]
    fn test_guard_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.guard");

        let guard = acquire_guard(&path, "acquire", policy(10)).unwrap();
        assert!(path.exists());
        let meta = GuardMetadata::from_file(&path).unwrap();
        assert_eq!(meta.action, "acquire");

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_manual_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.guard");

        let guard = acquire_guard(&path, "release", policy(10)).unwrap();
        guard.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_live_guard_times_out_busy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.guard");

        let _held = acquire_guard(&path, "acquire", policy(10)).unwrap();
        let err = acquire_guard(&path, "release", policy(20)).unwrap_err();

        assert!(matches!(err, BatonError::StoreBusy(_)));
        assert!(err.to_string().contains("acquire"));
    }

    #[test]
    fn test_stale_guard_is_reclaimed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.guard");

        let stale = GuardMetadata {
            owner: "ghost@host".to_string(),
            pid: Some(1),
            created_at: Utc::now() - chrono::Duration::minutes(5),
            action: "acquire".to_string(),
        };
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let guard = acquire_guard(&path, "kick", policy(10)).unwrap();
        let meta = GuardMetadata::from_file(&path).unwrap();
        assert_eq!(meta.action, "kick");
        drop(guard);
    }

    #[test]
    fn test_waiter_gets_guard_after_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.guard");

        let held = acquire_guard(&path, "acquire", policy(10)).unwrap();
        let waiter_path = path.clone();
        let waiter = std::thread::spawn(move || {
            acquire_guard(&waiter_path, "release", policy(5_000)).map(|g| g.release())
        });

        std::thread::sleep(Duration::from_millis(20));
        drop(held);

        waiter.join().unwrap().unwrap().unwrap();
    }
}
