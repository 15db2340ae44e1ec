pub mod config;
pub mod hook;
pub mod install;

/// Proceed, including a bypassed block.
pub const EXIT_OK: i32 = 0;
/// A blocking check failed.
pub const EXIT_BLOCKED: i32 = 1;
/// Configuration error or tooling crash.
pub const EXIT_ERROR: i32 = 2;
