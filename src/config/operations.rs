//! Config loading, overrides, and validation.

use super::model::Config;
use super::types::{MentionStyle, StoreBackend};
use crate::error::{BatonError, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding `store.dir`.
pub const ENV_STORE_DIR: &str = "BATON_STORE_DIR";
/// Environment variable overriding `store.backend`.
pub const ENV_STORE_BACKEND: &str = "BATON_STORE_BACKEND";
/// Environment variable overriding `command_prefix`.
pub const ENV_COMMAND_PREFIX: &str = "BATON_COMMAND_PREFIX";
/// Environment variable overriding `mention_style`.
pub const ENV_MENTION_STYLE: &str = "BATON_MENTION_STYLE";

impl Config {
    /// Load config from a YAML file.
    ///
    /// The result is parsed but not validated; call [`Config::validate`]
    /// once every override has been applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BatonError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| BatonError::ConfigError(format!("failed to parse config YAML: {}", e)))
    }

    /// Apply `BATON_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `BATON_*` overrides from an arbitrary lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_STORE_DIR) {
            self.store.dir = Some(PathBuf::from(dir));
        }

        if let Some(backend) = get(ENV_STORE_BACKEND) {
            self.store.backend = StoreBackend::from_str(&backend).ok_or_else(|| {
                BatonError::ConfigError(format!(
                    "{} must be 'file' or 'memory' (found '{}')",
                    ENV_STORE_BACKEND, backend
                ))
            })?;
        }

        if let Some(prefix) = get(ENV_COMMAND_PREFIX) {
            self.command_prefix = prefix;
        }

        if let Some(style) = get(ENV_MENTION_STYLE) {
            self.mention_style = MentionStyle::from_str(&style).ok_or_else(|| {
                BatonError::ConfigError(format!(
                    "{} must be 'plain' or 'slack' (found '{}')",
                    ENV_MENTION_STYLE, style
                ))
            })?;
        }

        Ok(())
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - the file backend needs a non-empty `store.dir`
    /// - `store.guard_stale_seconds` must be positive
    /// - `command_prefix` must be non-empty and contain no whitespace
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::File {
            match &self.store.dir {
                Some(dir) if !dir.as_os_str().is_empty() => {}
                _ => {
                    return Err(BatonError::ConfigError(format!(
                        "store.dir must be set for the file backend (config file, {} or --store-dir)",
                        ENV_STORE_DIR
                    )));
                }
            }
        }

        if self.store.guard_stale_seconds == 0 {
            return Err(BatonError::ConfigError(
                "store.guard_stale_seconds must be greater than 0".to_string(),
            ));
        }

        if self.command_prefix.is_empty() {
            return Err(BatonError::ConfigError(
                "command_prefix must not be empty".to_string(),
            ));
        }

        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(BatonError::ConfigError(format!(
                "command_prefix must not contain whitespace (found '{}')",
                self.command_prefix
            )));
        }

        Ok(())
    }
}
