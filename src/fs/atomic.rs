//! Atomic filesystem operations for baton.
//!
//! Token records are never left half-written. Both operations here write
//! the full content to a temporary file in the target's directory and fsync
//! it before the content becomes visible under the target name:
//!
//! - [`atomic_write`] replaces the target with `rename()`.
//! - [`atomic_create`] publishes the target with `hard_link()`, which fails
//!   if the target already exists. This gives create-if-absent semantics
//!   without a window in which readers could see an empty file.
//!
//! Source and destination must be on the same filesystem. On crash a
//! temporary file (`.{filename}.{pid}.{seq}.tmp`) may remain; readers skip
//! dot-files.

use crate::error::{BatonError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Atomically write bytes to a file, replacing any existing content.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        BatonError::StoreError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    sync_parent(path);
    Ok(())
}

/// Atomically create a file with the given content if it does not exist.
///
/// Returns `Ok(true)` if this call created the file and `Ok(false)` if a
/// file was already present. Exactly one of several concurrent callers
/// gets `true`.
pub fn atomic_create<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<bool> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => {
            sync_parent(path);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(BatonError::StoreError(format!(
            "failed to create '{}': {}",
            path.display(),
            e
        ))),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// Generate a unique temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BatonError::StoreError("invalid file path".to_string()))?;

    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.{}.{}.tmp", filename, std::process::id(), seq);
    Ok(parent.join(temp_name))
}

/// Write content to a file and sync to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        BatonError::StoreError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        BatonError::StoreError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        BatonError::StoreError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Persist the directory entry. Best effort; not every platform allows it.
fn sync_parent(path: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[test]
    fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.json");

        atomic_write(&file_path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
        assert_eq!(leftover_temp_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_atomic_write_replace_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.json");

        fs::write(&file_path, "original content").unwrap();
        atomic_write(&file_path, b"new content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dirs").join("test.json");

        atomic_write(&file_path, b"nested content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "nested content");
    }

    #[test]
    fn test_atomic_create_only_once() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("token.json");

        assert!(atomic_create(&file_path, b"first").unwrap());
        assert!(!atomic_create(&file_path, b"second").unwrap());

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "first");
        assert_eq!(leftover_temp_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_atomic_create_concurrent_single_winner() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = Arc::new(temp_dir.path().join("token.json"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&file_path);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let content = format!("writer {}", i);
                    (atomic_create(path.as_path(), content.as_bytes()).unwrap(), content)
                })
            })
            .collect();

        let results: Vec<(bool, String)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&String> = results
            .iter()
            .filter(|(created, _)| *created)
            .map(|(_, content)| content)
            .collect();

        assert_eq!(winners.len(), 1);
        assert_eq!(&fs::read_to_string(file_path.as_path()).unwrap(), winners[0]);
    }

    #[test]
    fn test_generate_temp_path_is_unique_dotfile() {
        let target = Path::new("/some/path/file.json");
        let a = generate_temp_path(target).unwrap();
        let b = generate_temp_path(target).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent().unwrap(), Path::new("/some/path"));
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".file.json."));
        assert!(name.ends_with(".tmp"));
    }
}
