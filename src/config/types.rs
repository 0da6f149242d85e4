//! Configuration types and defaults for baton.

use serde::{Deserialize, Serialize};

/// Which lock store backend serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Directory of JSON record files (default, survives restarts).
    #[default]
    File,
    /// Process-local map; state is lost on exit.
    Memory,
}

impl StoreBackend {
    /// Parse a backend name from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// How caller identities are rendered inside reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentionStyle {
    /// The identity as-is: `bob`.
    #[default]
    Plain,
    /// Chat user mention: `<@bob>`.
    Slack,
}

impl MentionStyle {
    /// Parse a mention style from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(Self::Plain),
            "slack" => Some(Self::Slack),
            _ => None,
        }
    }

    /// Render a caller identity for reply text.
    pub fn render(&self, user: &str) -> String {
        match self {
            MentionStyle::Plain => user.to_string(),
            MentionStyle::Slack => format!("<@{}>", user),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_command_prefix() -> String {
    "/token".to_string()
}
pub(crate) fn default_guard_stale_seconds() -> u64 {
    30
}
pub(crate) fn default_guard_wait_ms() -> u64 {
    2000
}
pub(crate) fn default_true() -> bool {
    true
}
