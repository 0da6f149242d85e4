//! Command handlers and routing.
//!
//! [`TokenService`] carries everything a handler needs: the shared store,
//! reply formatting settings and the optional audit log. It holds no token
//! state of its own; every request reads fresh snapshots from the store and
//! writes through its compare-and-swap, so one service can serve many
//! threads at once.
//!
//! Handlers live one verb (or verb pair) per file and are reached through
//! the fixed table in [`router`].

mod acquire;
mod create;
mod release;
mod reply;
pub mod router;
mod show;


pub use reply::{Reply, Visibility};

use crate::config::{Config, MentionStyle, StoreBackend};
use crate::error::Result;
use crate::events::{Event, EventLog};
use crate::store::{self, LockStore, Lookup};
use crate::token::{Token, TransitionError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless request handler over a shared lock store.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn LockStore>,
    prefix: String,
    mentions: MentionStyle,
    events: Option<EventLog>,
}

impl TokenService {
    /// Service over an already opened store, without an audit log.
    pub fn new(store: Arc<dyn LockStore>, config: &Config) -> Self {
        Self {
            store,
            prefix: config.command_prefix.clone(),
            mentions: config.mention_style,
            events: None,
        }
    }

    /// Open the configured store (and audit log) and build a service.
    ///
    /// `config` must already be validated.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = store::open(&config.store)?;
        let mut service = Self::new(store, config);

        if config.store.backend == StoreBackend::File
            && config.store.audit_log
            && let Some(dir) = &config.store.dir
        {
            let log = EventLog::in_dir(dir);
            debug!(path = %log.path().display(), "audit log enabled");
            service = service.with_event_log(log);
        }

        Ok(service)
    }

    /// Record successful mutations to `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    /// The command prefix used in hints and usage text.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn mention(&self, user: &str) -> String {
        self.mentions.render(user)
    }

    fn not_found(&self, name: &str) -> Reply {
        Reply::ephemeral(format!(
            "Token {} does not exist. Use `{} create {}` to create it.",
            name, self.prefix, name
        ))
    }

    /// Fetch a token, or the "does not exist" reply to send instead.
    fn load(&self, name: &str) -> Result<std::result::Result<Token, Reply>> {
        Ok(match self.store.get(name)? {
            Lookup::Found(token) => Ok(token),
            Lookup::NotFound => Err(self.not_found(name)),
        })
    }

    /// Ephemeral reply explaining why a transition was refused.
    fn refusal(&self, name: &str, user: &str, err: TransitionError) -> Reply {
        let text = match err {
            TransitionError::AlreadyAcquired { holder } if holder == user => {
                format!("Token {} is already in your possession.", name)
            }
            TransitionError::AlreadyAcquired { holder } => format!(
                "Token {} is already in {}'s possession.",
                name,
                self.mention(&holder)
            ),
            TransitionError::NotAcquired => {
                format!("Token {} is not currently held by anyone.", name)
            }
            TransitionError::NotYours { holder } => format!(
                "Token {} is currently held by {}.",
                name,
                self.mention(&holder)
            ),
        };
        Reply::ephemeral(text)
    }

    /// Append to the audit log if one is configured.
    ///
    /// The state change has already been committed, so a failed append is
    /// logged and otherwise ignored.
    fn record(&self, event: Event) {
        if let Some(log) = &self.events
            && let Err(e) = log.append(&event)
        {
            warn!(error = %e, action = %event.action, token = %event.token, "failed to append audit event");
        }
    }
}
