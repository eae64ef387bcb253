//! Deterministic, pure logic shared by the analysis loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! text and return deterministic outputs suitable for tests.

pub mod budget;
pub mod classifier;
pub mod naming;
pub mod sanitize;
pub mod types;
