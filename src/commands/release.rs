//! `release` and `kick`: return a held token to Free.

use super::{Reply, TokenService};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::store::{Lookup, UpdateOutcome};
use serde_json::json;
use tracing::{debug, info};

impl TokenService {
    /// Release a token held by `user`.
    pub fn release(&self, user: &str, name: &str) -> Result<Reply> {
        self.release_token(user, name, false)
    }

    /// Release a token regardless of who holds it.
    pub fn kick(&self, user: &str, name: &str) -> Result<Reply> {
        self.release_token(user, name, true)
    }

    fn release_token(&self, user: &str, name: &str, force: bool) -> Result<Reply> {
        let token = match self.load(name)? {
            Ok(token) => token,
            Err(reply) => return Ok(reply),
        };

        let next = match token.state.release(user, force) {
            Ok(next) => next,
            Err(err) => return Ok(self.refusal(name, user, err)),
        };
        // Held, or release() would have refused
        let holder = token.state.holder().unwrap_or_default().to_string();

        match self.store.conditional_update(name, &token.state, &next)? {
            UpdateOutcome::Applied if force => {
                info!(token = name, user, previous_holder = %holder, "token kicked");
                self.record(
                    Event::new(EventAction::Kick, user, name)
                        .with_details(json!({ "previous_holder": holder })),
                );
                Ok(Reply::broadcast(format!(
                    "Token {} (held by {}) has been forcefully released by {} and is now free to take.",
                    name,
                    self.mention(&holder),
                    self.mention(user)
                )))
            }
            UpdateOutcome::Applied => {
                info!(token = name, user, "token released");
                self.record(Event::new(EventAction::Release, user, name));
                Ok(Reply::broadcast(format!(
                    "Token {} released by {} and is now free to take.",
                    name,
                    self.mention(user)
                )))
            }
            UpdateOutcome::PreconditionFailed => {
                debug!(token = name, user, force, "release lost a race, re-reading");
                let current = match self.store.get(name)? {
                    Lookup::Found(current) => current,
                    Lookup::NotFound => return Ok(self.not_found(name)),
                };
                Ok(match current.state.release(user, force) {
                    Err(err) => self.refusal(name, user, err),
                    Ok(_) => Reply::ephemeral(format!(
                        "Token {} changed while releasing it. Try again.",
                        name
                    )),
                })
            }
        }
    }
}
