//! Read-only commands: `show` and `list`.

use super::{Reply, TokenService};
use crate::error::Result;
use crate::token::{Token, TokenState};

impl TokenService {
    /// Report whether `name` is free or who holds it.
    pub fn show(&self, _user: &str, name: &str) -> Result<Reply> {
        Ok(match self.load(name)? {
            Ok(token) => Reply::ephemeral(format!("Token {} is {}.", name, self.status(&token))),
            Err(reply) => reply,
        })
    }

    /// One status line per known token.
    pub fn list(&self, _user: &str) -> Result<Reply> {
        let tokens = self.store.list()?;
        if tokens.is_empty() {
            return Ok(Reply::ephemeral(format!(
                "No tokens exist yet. Use `{} create [name]` to create one.",
                self.prefix
            )));
        }

        let lines: Vec<String> = tokens
            .iter()
            .map(|token| format!("- {}: {}", token.name, self.status(token)))
            .collect();
        Ok(Reply::ephemeral(format!(
            "Tokens ({}):\n{}",
            tokens.len(),
            lines.join("\n")
        )))
    }

    fn status(&self, token: &Token) -> String {
        match &token.state {
            TokenState::Free => "free to take".to_string(),
            TokenState::Held { by, since } => format!(
                "held by {} since {}",
                self.mention(by),
                since.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        }
    }
}
