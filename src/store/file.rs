//! File-backed lock store.
//!
//! Layout of the store directory:
//!
//! ```text
//! <dir>/
//!   <hex(name)>.json    token record
//!   <hex(name)>.guard   present only while a conditional update runs
//!   events.ndjson       audit log (see `events`)
//! ```
//!
//! File stems are the lowercase hex encoding of the token name's UTF-8
//! bytes, so names stay case-sensitive on any filesystem and can't contain
//! path separators. Names longer than [`MAX_HEX_NAME_BYTES`] use
//! `sha256-<digest>` instead, which keeps every file name (temporaries
//! included) well under the usual 255-byte limit. Each record carries its
//! own name, and a mismatch on read is a store error.

use super::guard::{GuardPolicy, acquire_guard};
use super::{CreateOutcome, LockStore, Lookup, UpdateOutcome};
use crate::error::{BatonError, Result};
use crate::fs::{atomic_create, atomic_write};
use crate::token::{Token, TokenRecord, TokenState};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "json";
const GUARD_EXTENSION: &str = "guard";

/// Longest name (in UTF-8 bytes) stored under its plain hex encoding.
pub const MAX_HEX_NAME_BYTES: usize = 64;

/// Token records stored as one JSON file each.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    policy: GuardPolicy,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to create store directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir,
            policy: GuardPolicy {
                stale_after: Duration::from_secs(30),
                wait: Duration::from_millis(2000),
            },
        })
    }

    /// Guards older than this are removed as abandoned.
    pub fn with_guard_stale_after(mut self, stale_after: Duration) -> Self {
        self.policy.stale_after = stale_after;
        self
    }

    /// How long a conditional update waits for a held guard.
    pub fn with_guard_wait(mut self, wait: Duration) -> Self {
        self.policy.wait = wait;
        self
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `name`.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_name(name), RECORD_EXTENSION))
    }

    fn guard_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_name(name), GUARD_EXTENSION))
    }

    fn read_record(&self, path: &Path, name: Option<&str>) -> Result<Option<Token>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BatonError::StoreError(format!(
                    "failed to read record '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let record: TokenRecord = serde_json::from_str(&content).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to parse record '{}': {}",
                path.display(),
                e
            ))
        })?;

        if let Some(name) = name
            && record.name != name
        {
            return Err(BatonError::StoreError(format!(
                "record '{}' belongs to token '{}', expected '{}'",
                path.display(),
                record.name,
                name
            )));
        }

        Token::try_from(record)
            .map(Some)
            .map_err(|e| BatonError::StoreError(format!("corrupt record '{}': {}", path.display(), e)))
    }
}

fn to_json(token: &Token) -> Result<String> {
    serde_json::to_string_pretty(&TokenRecord::from(token))
        .map_err(|e| BatonError::StoreError(format!("failed to serialize token record: {}", e)))
}

/// File stem for `name`: lowercase hex of its UTF-8 bytes, or a SHA-256
/// digest for long names. The two forms can't collide since hex stems
/// never contain `-`.
fn encode_name(name: &str) -> String {
    if name.len() <= MAX_HEX_NAME_BYTES {
        name.bytes().map(|b| format!("{:02x}", b)).collect()
    } else {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        format!("sha256-{:x}", hasher.finalize())
    }
}

fn update_action(expected: &TokenState, new: &TokenState) -> &'static str {
    match (expected, new) {
        (TokenState::Free, TokenState::Held { .. }) => "acquire",
        (TokenState::Held { .. }, TokenState::Free) => "release",
        _ => "update",
    }
}

impl LockStore for FileStore {
    fn get(&self, name: &str) -> Result<Lookup> {
        let token = self.read_record(&self.record_path(name), Some(name))?;
        Ok(match token {
            Some(token) => Lookup::Found(token),
            None => Lookup::NotFound,
        })
    }

    fn create_if_absent(&self, name: &str) -> Result<CreateOutcome> {
        let json = to_json(&Token::new(name))?;
        let created = atomic_create(self.record_path(name), json.as_bytes())?;
        debug!(token = name, created, "create_if_absent");
        Ok(if created {
            CreateOutcome::Created
        } else {
            CreateOutcome::AlreadyExists
        })
    }

    fn conditional_update(
        &self,
        name: &str,
        expected: &TokenState,
        new: &TokenState,
    ) -> Result<UpdateOutcome> {
        let record_path = self.record_path(name);
        let guard = acquire_guard(
            &self.guard_path(name),
            update_action(expected, new),
            self.policy,
        )?;

        let current = match self.read_record(&record_path, Some(name))? {
            Some(token) => token,
            None => return Ok(UpdateOutcome::PreconditionFailed),
        };

        if current.state != *expected {
            debug!(token = name, "conditional update rejected: state changed");
            return Ok(UpdateOutcome::PreconditionFailed);
        }

        let updated = Token {
            name: name.to_string(),
            state: new.clone(),
        };
        atomic_write(&record_path, to_json(&updated)?.as_bytes())?;
        guard.release()?;

        debug!(token = name, "conditional update applied");
        Ok(UpdateOutcome::Applied)
    }

    fn list(&self) -> Result<Vec<Token>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to read store directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut tokens = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                BatonError::StoreError(format!("failed to read store directory entry: {}", e))
            })?;
            let path = entry.path();

            // Skip temporaries, guards, and the audit log
            let is_hidden = entry.file_name().to_string_lossy().starts_with('.');
            if is_hidden || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match self.read_record(&path, None) {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping unreadable token record"),
            }
        }

        tokens.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tokens)
    }
}
