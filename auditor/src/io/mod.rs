//! Side-effecting adapters: configuration, processes, oracle, prompts and files.

pub mod config;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod store;
pub mod toolchain;
pub mod workspace;
