//! Error types for baton.
//!
//! Domain outcomes (token missing, already held, not yours, ...) are not
//! errors: they are enum values matched by the command handlers and turned
//! into replies. `BatonError` covers only what a reply cannot express.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for baton operations.
#[derive(Error, Debug)]
pub enum BatonError {
    /// Bad invocation or unreadable input.
    #[error("{0}")]
    UserError(String),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The lock store could not complete the request.
    #[error("store error: {0}")]
    StoreError(String),

    /// A record guard stayed held past the configured wait.
    #[error("store busy: {0}")]
    StoreBusy(String),
}

impl BatonError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BatonError::UserError(_) => exit_codes::USER_ERROR,
            BatonError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            BatonError::StoreError(_) | BatonError::StoreBusy(_) => exit_codes::STORE_FAILURE,
        }
    }
}

/// Result type alias for baton operations.
pub type Result<T> = std::result::Result<T, BatonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = BatonError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = BatonError::ConfigError("store.dir is required".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn store_errors_share_exit_code() {
        assert_eq!(
            BatonError::StoreError("disk full".to_string()).exit_code(),
            exit_codes::STORE_FAILURE
        );
        assert_eq!(
            BatonError::StoreBusy("guard held".to_string()).exit_code(),
            exit_codes::STORE_FAILURE
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = BatonError::ConfigError("store.dir is required".to_string());
        assert_eq!(err.to_string(), "configuration error: store.dir is required");

        let err = BatonError::StoreError("record corrupt".to_string());
        assert_eq!(err.to_string(), "store error: record corrupt");
    }
}
