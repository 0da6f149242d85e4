//! Audit log of token state changes.
//!
//! Events are stored in NDJSON format (one JSON object per line) in
//! `events.ndjson` inside the file store's directory. Only successful
//! mutations are recorded; queries and refused commands are not.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: `create`, `acquire`, `release` or `kick`
//! - `actor`: the caller identity that issued the command
//! - `token`: the token name
//! - `details`: freeform object with action-specific details

use crate::error::{BatonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the audit log inside the store directory.
pub const EVENTS_FILE: &str = "events.ndjson";

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Token created
    Create,
    /// Token acquired (Free -> Held)
    Acquire,
    /// Token released by its holder (Held -> Free)
    Release,
    /// Token forcibly released by someone else (Held -> Free)
    Kick,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Create => write!(f, "create"),
            EventAction::Acquire => write!(f, "acquire"),
            EventAction::Release => write!(f, "release"),
            EventAction::Kick => write!(f, "kick"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// When the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Caller identity that issued the command.
    pub actor: String,

    /// Token the action applied to.
    pub token: String,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the current timestamp.
    pub fn new(action: EventAction, actor: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor.into(),
            token: token.into(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BatonError::StoreError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Append-only NDJSON event sink.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Event log stored in `dir/events.ndjson`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(EVENTS_FILE),
        }
    }

    /// Location of the NDJSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line.
    ///
    /// Each event is written with a single `write` call on a file opened in
    /// append mode, so lines from concurrent writers do not interleave.
    pub fn append(&self, event: &Event) -> Result<()> {
        let mut line = event.to_ndjson_line()?;
        line.push('\n');

        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                BatonError::StoreError(format!(
                    "failed to create events directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                BatonError::StoreError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(line.as_bytes()).map_err(|e| {
            BatonError::StoreError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            BatonError::StoreError(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Read every event back, oldest first.
    #[cfg(test)]
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BatonError::StoreError(format!(
                    "failed to read events file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    BatonError::StoreError(format!("failed to parse event line: {}", e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Acquire, "bob", "deploy-lock");

        assert_eq!(event.action, EventAction::Acquire);
        assert_eq!(event.actor, "bob");
        assert_eq!(event.token, "deploy-lock");
        assert!(event.details.as_object().unwrap().is_empty());
        assert!(Utc::now().signed_duration_since(event.ts).num_minutes() < 1);
    }

    #[test]
    fn test_event_ndjson_is_single_line() {
        let event = Event::new(EventAction::Kick, "alice", "deploy-lock")
            .with_details(json!({"previous_holder": "bob\nwith newline"}));

        let line = event.to_ndjson_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains(r#""action":"kick""#));
        assert!(line.contains(r#""previous_holder""#));
    }

    #[test]
    fn test_action_display_matches_serde() {
        for action in [
            EventAction::Create,
            EventAction::Acquire,
            EventAction::Release,
            EventAction::Kick,
        ] {
            let serialized = serde_json::to_string(&action).unwrap();
            assert_eq!(serialized, format!("\"{}\"", action));
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::in_dir(temp_dir.path());

        assert!(log.read_all().unwrap().is_empty());

        log.append(&Event::new(EventAction::Create, "bob", "t")).unwrap();
        log.append(&Event::new(EventAction::Acquire, "bob", "t")).unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Create);
        assert_eq!(events[1].action, EventAction::Acquire);

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn test_append_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::in_dir(temp_dir.path().join("store"));

        log.append(&Event::new(EventAction::Create, "bob", "t")).unwrap();
        assert!(log.path().exists());
    }
}
