//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - every bundle was written without error diagnostics
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// The run finished but recorded error diagnostics (skipped files or bundles)
pub const COMPLETED_WITH_ERRORS: i32 = 2;

/// Configuration error - unreadable config file, invalid chart version
pub const CONFIG_ERROR: i32 = 4;

/// IO error - input not found, output not writable
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
