//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a baton service.
///
/// Loaded from an optional YAML file, then overridden by `BATON_*`
/// environment variables and command-line flags. Unknown YAML fields are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lock store settings.
    pub store: StoreConfig,

    /// Slash-command prefix shown in usage and "create it" hints.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// How caller identities appear in reply text.
    #[serde(default)]
    pub mention_style: MentionStyle,
}

/// Lock store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend serving requests.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory holding token records. Required for the file backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Seconds after which a record guard is considered abandoned.
    #[serde(default = "default_guard_stale_seconds")]
    pub guard_stale_seconds: u64,

    /// Milliseconds to wait for a held record guard before giving up.
    #[serde(default = "default_guard_wait_ms")]
    pub guard_wait_ms: u64,

    /// Whether successful mutations are appended to `events.ndjson`.
    #[serde(default = "default_true")]
    pub audit_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            command_prefix: default_command_prefix(),
            mention_style: MentionStyle::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dir: None,
            guard_stale_seconds: default_guard_stale_seconds(),
            guard_wait_ms: default_guard_wait_ms(),
            audit_log: default_true(),
        }
    }
}
