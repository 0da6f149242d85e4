//! Lock store: the single source of truth for token state.
//!
//! Every operation on a [`LockStore`] is atomic with respect to concurrent
//! callers, in this process or (for the file backend) any other. Handlers
//! never lock anything themselves: mutual exclusion rests entirely on
//! [`LockStore::create_if_absent`] and [`LockStore::conditional_update`].
//!
//! # Backends
//!
//! - [`MemoryStore`]: a mutex-protected map, for tests and single-process use.
//! - [`FileStore`]: one JSON record per token in a directory, shared by
//!   every process pointed at it.

mod file;
mod guard;
mod memory;


pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{BatonError, Result};
use crate::token::{Token, TokenState};
use std::sync::Arc;

/// Result of looking up a token by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Token),
    NotFound,
}

/// Result of [`LockStore::create_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Result of [`LockStore::conditional_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored state matched and was replaced.
    Applied,
    /// The stored state differed from the expected one (or the token does
    /// not exist); nothing was written.
    PreconditionFailed,
}

/// Key-value store of token records with atomic primitives.
///
/// `Err` is reserved for the store being unable to answer (I/O failure,
/// corrupt record, contention timeout). Domain outcomes are enum values.
pub trait LockStore: Send + Sync {
    /// Snapshot of a token.
    fn get(&self, name: &str) -> Result<Lookup>;

    /// Create a free token unless one with this name exists.
    ///
    /// Exactly one of several concurrent callers receives `Created`.
    fn create_if_absent(&self, name: &str) -> Result<CreateOutcome>;

    /// Replace the token's state with `new` only if it currently equals
    /// `expected`.
    ///
    /// `expected` must be the full state observed at read time, holder and
    /// timestamp included, so that an intervening acquire/release/acquire
    /// cycle is detected.
    fn conditional_update(
        &self,
        name: &str,
        expected: &TokenState,
        new: &TokenState,
    ) -> Result<UpdateOutcome>;

    /// All tokens, sorted by name.
    fn list(&self) -> Result<Vec<Token>>;
}

/// Open the store described by the configuration.
///
/// The configuration is expected to have passed `Config::validate`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn LockStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => {
            let dir = config.dir.as_ref().ok_or_else(|| {
                BatonError::ConfigError("store.dir must be set for the file backend".to_string())
            })?;
            let store = FileStore::open(dir)?
                .with_guard_stale_after(std::time::Duration::from_secs(config.guard_stale_seconds))
                .with_guard_wait(std::time::Duration::from_millis(config.guard_wait_ms));
            tracing::debug!(dir = %store.dir().display(), "opened file store");
            Ok(Arc::new(store))
        }
    }
}
