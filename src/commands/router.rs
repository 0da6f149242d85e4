//! Verb routing.
//!
//! The registry is a fixed table: a verb reaches a handler only if it is
//! listed here. Unknown verbs and wrong argument counts are answered with
//! a reply instead of an error.

use super::{Reply, TokenService};
use crate::error::Result;
use tracing::debug;

type NamedHandler = fn(&TokenService, &str, &str) -> Result<Reply>;
type BareHandler = fn(&TokenService, &str) -> Result<Reply>;

/// Handler signature, which also fixes the expected argument count.
#[derive(Clone, Copy)]
enum Handler {
    /// Takes exactly one argument: the token name.
    Named(NamedHandler),
    /// Takes no arguments.
    Bare(BareHandler),
}

/// One registered command.
pub struct CommandSpec {
    pub verb: &'static str,
    /// Usage line; `{prefix}` is replaced by the configured command prefix.
    pub usage: &'static str,
    handler: Handler,
}

impl CommandSpec {
    /// Number of arguments the command accepts.
    pub fn arity(&self) -> usize {
        match self.handler {
            Handler::Named(_) => 1,
            Handler::Bare(_) => 0,
        }
    }

    /// Usage line rendered with `prefix`.
    pub fn usage_for(&self, prefix: &str) -> String {
        self.usage.replace("{prefix}", prefix)
    }
}

/// Every command the service understands, in help order.
pub static COMMANDS: [CommandSpec; 7] = [
    CommandSpec {
        verb: "create",
        usage: "`{prefix} create [name]` - Creates a new token. Does nothing if a token with this name already exists.",
        handler: Handler::Named(TokenService::create),
    },
    CommandSpec {
        verb: "acquire",
        usage: "`{prefix} acquire [name]` - Acquires an existing token. Fails if the token is already acquired or does not exist.",
        handler: Handler::Named(TokenService::acquire),
    },
    CommandSpec {
        verb: "release",
        usage: "`{prefix} release [name]` - Releases a token. Fails if the token does not exist or is in possession of somebody else.",
        handler: Handler::Named(TokenService::release),
    },
    CommandSpec {
        verb: "kick",
        usage: "`{prefix} kick [name]` - Releases a token that is presently in someone else's possession. Use sparingly.",
        handler: Handler::Named(TokenService::kick),
    },
    CommandSpec {
        verb: "show",
        usage: "`{prefix} show [name]` - Shows token status.",
        handler: Handler::Named(TokenService::show),
    },
    CommandSpec {
        verb: "list",
        usage: "`{prefix} list` - Lists every token and its status.",
        handler: Handler::Bare(TokenService::list),
    },
    CommandSpec {
        verb: "help",
        usage: "`{prefix} help` - Shows this help.",
        handler: Handler::Bare(TokenService::help),
    },
];

/// Find the registered command for `verb` (exact, case-sensitive match).
pub fn lookup(verb: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.verb == verb)
}

impl TokenService {
    /// Usage lines of every registered command.
    pub fn help(&self, _user: &str) -> Result<Reply> {
        let lines: Vec<String> = COMMANDS
            .iter()
            .map(|spec| spec.usage_for(&self.prefix))
            .collect();
        Ok(Reply::ephemeral(lines.join("\n")))
    }

    /// Route an already split command to its handler.
    pub fn dispatch(&self, verb: &str, args: &[&str], user: &str) -> Result<Reply> {
        let Some(spec) = lookup(verb) else {
            debug!(verb, user, "unknown command");
            return Ok(Reply::ephemeral(format!(
                "There is no such command: {}",
                verb
            )));
        };

        if args.len() != spec.arity() {
            debug!(verb, user, expected = spec.arity(), got = args.len(), "wrong argument count");
            return Ok(Reply::ephemeral(spec.usage_for(&self.prefix)));
        }

        debug!(verb, user, "dispatching command");
        match (spec.handler, args) {
            (Handler::Named(handler), [name]) => handler(self, user, name),
            (Handler::Bare(handler), []) => handler(self, user),
            _ => Ok(Reply::ephemeral(spec.usage_for(&self.prefix))),
        }
    }

    /// Split raw command text on whitespace and dispatch it.
    ///
    /// Blank text is answered with the help listing.
    pub fn dispatch_text(&self, text: &str, user: &str) -> Result<Reply> {
        let words: Vec<&str> = text.split_whitespace().collect();
        match words.split_first() {
            Some((verb, args)) => self.dispatch(verb, args, user),
            None => self.help(user),
        }
    }
}
