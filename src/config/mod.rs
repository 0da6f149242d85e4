//! Configuration for baton.
//!
//! Settings come from an optional YAML file, then `BATON_*` environment
//! variables, then command-line flags. The merged result is validated once
//! at startup, before any command is dispatched.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::{Config, StoreConfig};
pub use operations::{ENV_COMMAND_PREFIX, ENV_MENTION_STYLE, ENV_STORE_BACKEND, ENV_STORE_DIR};
pub use types::{MentionStyle, StoreBackend};
