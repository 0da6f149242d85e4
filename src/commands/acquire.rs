//! `acquire`: take a free token.

use super::{Reply, TokenService};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::store::{Lookup, UpdateOutcome};
use chrono::Utc;
use tracing::{debug, info};

impl TokenService {
    /// Move `name` from Free to Held by `user`.
    ///
    /// The write is conditioned on the exact state read at the start of the
    /// request. When another caller wins in between, the token is read
    /// again so the reply names whoever actually holds it now.
    pub fn acquire(&self, user: &str, name: &str) -> Result<Reply> {
        let token = match self.load(name)? {
            Ok(token) => token,
            Err(reply) => return Ok(reply),
        };

        let next = match token.state.acquire(user, Utc::now()) {
            Ok(next) => next,
            Err(err) => return Ok(self.refusal(name, user, err)),
        };

        match self.store.conditional_update(name, &token.state, &next)? {
            UpdateOutcome::Applied => {
                info!(token = name, user, "token acquired");
                self.record(Event::new(EventAction::Acquire, user, name));
                Ok(Reply::broadcast(format!(
                    "Token {} now held by {}.",
                    name,
                    self.mention(user)
                )))
            }
            UpdateOutcome::PreconditionFailed => {
                debug!(token = name, user, "acquire lost a race, re-reading");
                let current = match self.store.get(name)? {
                    Lookup::Found(current) => current,
                    Lookup::NotFound => return Ok(self.not_found(name)),
                };
                Ok(match current.state.acquire(user, Utc::now()) {
                    Err(err) => self.refusal(name, user, err),
                    // Released again before we could look; don't retry here.
                    Ok(_) => Reply::ephemeral(format!(
                        "Token {} changed while acquiring it. Try again.",
                        name
                    )),
                })
            }
        }
    }
}
