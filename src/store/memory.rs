//! In-memory lock store.

use super::{CreateOutcome, LockStore, Lookup, UpdateOutcome};
use crate::error::{BatonError, Result};
use crate::token::{Token, TokenState};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local token table.
///
/// Each operation runs inside one critical section of the table mutex, so
/// compare and write can't be interleaved with another caller's.
/// `BTreeMap` keeps `list` ordered without sorting.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<BTreeMap<String, TokenState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, BTreeMap<String, TokenState>>> {
        self.tokens
            .lock()
            .map_err(|_| BatonError::StoreError("memory store mutex poisoned".to_string()))
    }
}

impl LockStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Lookup> {
        let table = self.table()?;
        Ok(match table.get(name) {
            Some(state) => Lookup::Found(Token {
                name: name.to_string(),
                state: state.clone(),
            }),
            None => Lookup::NotFound,
        })
    }

    fn create_if_absent(&self, name: &str) -> Result<CreateOutcome> {
        let mut table = self.table()?;
        if table.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        table.insert(name.to_string(), TokenState::Free);
        Ok(CreateOutcome::Created)
    }

    fn conditional_update(
        &self,
        name: &str,
        expected: &TokenState,
        new: &TokenState,
    ) -> Result<UpdateOutcome> {
        let mut table = self.table()?;
        match table.get_mut(name) {
            Some(current) if current == expected => {
                *current = new.clone();
                Ok(UpdateOutcome::Applied)
            }
            _ => Ok(UpdateOutcome::PreconditionFailed),
        }
    }

    fn list(&self) -> Result<Vec<Token>> {
        let table = self.table()?;
        Ok(table
            .iter()
            .map(|(name, state)| Token {
                name: name.clone(),
                state: state.clone(),
            })
            .collect())
    }
}
