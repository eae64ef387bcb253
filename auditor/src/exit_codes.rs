//! Stable exit codes for auditor CLI commands.

/// Command succeeded; for `analyze`, all tests passed.
pub const OK: i32 = 0;
/// Command failed due to invalid config/input, an oracle failure or other errors.
pub const INVALID: i32 = 1;
/// `auditor analyze` produced a vulnerability analysis.
pub const VULNERABLE: i32 = 2;
/// `auditor analyze` could not make the generated test build or run.
pub const UNREPAIRABLE: i32 = 3;
