//! `create`: register a new token.

use super::{Reply, TokenService};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::store::CreateOutcome;
use tracing::info;

impl TokenService {
    /// Create a free token named `name`.
    ///
    /// Idempotent: when the token already exists (including when another
    /// request created it a moment ago) nothing changes and the caller is
    /// told so.
    pub fn create(&self, user: &str, name: &str) -> Result<Reply> {
        match self.store.create_if_absent(name)? {
            CreateOutcome::Created => {
                info!(token = name, user, "token created");
                self.record(Event::new(EventAction::Create, user, name));
                Ok(Reply::broadcast(format!(
                    "Token {} created by {}.",
                    name,
                    self.mention(user)
                )))
            }
            CreateOutcome::AlreadyExists => {
                Ok(Reply::ephemeral(format!("Token {} already exists.", name)))
            }
        }
    }
}
