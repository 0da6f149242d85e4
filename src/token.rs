//! Token entity and its state machine.
//!
//! A token is either `Free` or `Held` by exactly one caller since a given
//! instant. The holder and the timestamp live in one enum variant, so a
//! token can never carry one without the other. Stored records keep the
//! two as separate optional fields; converting a record back into a
//! `Token` rejects any record where only one of them is set.
//!
//! Transitions here are pure: they compute the next state from a snapshot.
//! Persisting that state is the store's job, conditioned on the snapshot
//! (see `store::LockStore::conditional_update`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Nobody holds the token.
    Free,
    /// Held by `by` since `since`.
    Held { by: String, since: DateTime<Utc> },
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Acquire on a token that is not free.
    AlreadyAcquired { holder: String },
    /// Release or kick on a free token.
    NotAcquired,
    /// Unforced release by someone other than the holder.
    NotYours { holder: String },
}

impl TokenState {
    /// The current holder, if any.
    pub fn holder(&self) -> Option<&str> {
        match self {
            TokenState::Free => None,
            TokenState::Held { by, .. } => Some(by),
        }
    }

    /// Free -> Held(user).
    pub fn acquire(&self, user: &str, now: DateTime<Utc>) -> Result<TokenState, TransitionError> {
        match self {
            TokenState::Free => Ok(TokenState::Held {
                by: user.to_string(),
                since: now,
            }),
            TokenState::Held { by, .. } => Err(TransitionError::AlreadyAcquired {
                holder: by.clone(),
            }),
        }
    }

    /// Held(h) -> Free, allowed for `h` itself or when `force` is set.
    pub fn release(&self, user: &str, force: bool) -> Result<TokenState, TransitionError> {
        match self {
            TokenState::Free => Err(TransitionError::NotAcquired),
            TokenState::Held { by, .. } if by != user && !force => {
                Err(TransitionError::NotYours { holder: by.clone() })
            }
            TokenState::Held { .. } => Ok(TokenState::Free),
        }
    }
}

/// A named token snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub state: TokenState,
}

impl Token {
    /// A freshly created, free token.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: TokenState::Free,
        }
    }
}

/// Persisted form of a token.
///
/// Field names follow the token table schema (`acquired_by`,
/// `acquired_at`); both are `null` when the token is free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub name: String,

    #[serde(default)]
    pub acquired_by: Option<String>,

    #[serde(default)]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl From<&Token> for TokenRecord {
    fn from(token: &Token) -> Self {
        let (acquired_by, acquired_at) = match &token.state {
            TokenState::Free => (None, None),
            TokenState::Held { by, since } => (Some(by.clone()), Some(*since)),
        };
        Self {
            name: token.name.clone(),
            acquired_by,
            acquired_at,
        }
    }
}

impl TryFrom<TokenRecord> for Token {
    type Error = String;

    fn try_from(record: TokenRecord) -> Result<Self, Self::Error> {
        let state = match (record.acquired_by, record.acquired_at) {
            (None, None) => TokenState::Free,
            (Some(by), Some(since)) => TokenState::Held { by, since },
            (Some(_), None) => {
                return Err(format!(
                    "token '{}' has acquired_by set without acquired_at",
                    record.name
                ));
            }
            (None, Some(_)) => {
                return Err(format!(
                    "token '{}' has acquired_at set without acquired_by",
                    record.name
                ));
            }
        };
        Ok(Token {
            name: record.name,
            state,
        })
    }
}
