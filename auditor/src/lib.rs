//! Exploratory security testing for Solidity contracts.
//!
//! A run takes a contract and a question, asks a language-model oracle for a
//! Foundry test, repairs the test until it builds and runs, and reports either a
//! pass or a vulnerability analysis grounded in the failing tests.
//!
//! - **[`core`]**: Pure, deterministic logic (naming, sanitizing, classification,
//!   repair budgets). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, processes, oracle, files).
//!   Behind traits where tests need to replace them.
//!
//! [`analyze`] composes both into the repair-and-verify loop.

pub mod analyze;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod notify;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
