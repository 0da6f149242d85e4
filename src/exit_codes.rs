//! Exit code constants for the baton CLI.
//!
//! - 0: Success (including every domain outcome rendered as a reply)
//! - 1: User error (bad invocation, unreadable input)
//! - 2: Configuration error (detected at startup)
//! - 3: Store failure (I/O, corrupt record, record guard busy)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad invocation or unreadable input.
pub const USER_ERROR: i32 = 1;

/// Configuration error: missing or invalid settings found at startup.
pub const CONFIG_ERROR: i32 = 2;

/// Store failure: the lock store could not complete a request.
pub const STORE_FAILURE: i32 = 3;
