//! Filesystem utilities for baton.
//!
//! Atomic replace and atomic create-if-absent for token record files.

pub mod atomic;

pub use atomic::{atomic_create, atomic_write};
