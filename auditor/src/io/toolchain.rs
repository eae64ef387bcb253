//! Toolchain adapter for the external compiler and test runner.
//!
//! The [`Toolchain`] trait decouples the analysis loop from the actual backend
//! (currently `forge build` / `forge test`). Tests use scripted toolchains that
//! return predetermined outputs without spawning processes.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::ToolchainOutput;
use crate::io::config::ToolchainConfig;
use crate::io::process::run_command;

/// Abstraction over the build/test backend.
pub trait Toolchain {
    /// Compile the project rooted at `project_root`.
    fn build(&self, project_root: &Path) -> Result<ToolchainOutput>;
    /// Run the project's tests.
    fn test(&self, project_root: &Path) -> Result<ToolchainOutput>;
}

/// Toolchain that spawns the configured build and test commands.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    build_command: Vec<String>,
    test_command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandToolchain {
    pub fn from_config(cfg: &ToolchainConfig) -> Self {
        Self {
            build_command: cfg.build_command.clone(),
            test_command: cfg.test_command.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    fn invoke(&self, label: &str, argv: &[String], project_root: &Path) -> Result<ToolchainOutput> {
        info!(label, workdir = %project_root.display(), "invoking toolchain");
        let captured = run_command(argv, project_root, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run toolchain {label} ({})", argv.join(" ")))?;
        if captured.timed_out {
            warn!(label, timeout_secs = self.timeout.as_secs(), "toolchain timed out");
        }
        Ok(ToolchainOutput {
            text: captured.combined_text(),
            success: captured.succeeded(),
        })
    }
}

impl Toolchain for CommandToolchain {
    #[instrument(skip_all)]
    fn build(&self, project_root: &Path) -> Result<ToolchainOutput> {
        self.invoke("build", &self.build_command, project_root)
    }

    #[instrument(skip_all)]
    fn test(&self, project_root: &Path) -> Result<ToolchainOutput> {
        self.invoke("test", &self.test_command, project_root)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn toolchain(build: &str, test: &str) -> CommandToolchain {
        CommandToolchain::from_config(&ToolchainConfig {
            build_command: vec!["sh".to_string(), "-c".to_string(), build.to_string()],
            test_command: vec!["sh".to_string(), "-c".to_string(), test.to_string()],
            timeout_secs: 5,
            output_limit_bytes: 10_000,
        })
    }

    #[test]
    fn build_reports_combined_output_and_status() {
        let temp = tempfile::tempdir().expect("tempdir");
        let toolchain = toolchain("echo 'Error: boom' >&2; exit 1", "true");
        let output = toolchain.build(temp.path()).expect("build");
        assert!(!output.success);
        assert!(output.text.contains("Error: boom"));
    }

    #[test]
    fn test_runs_in_project_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "here").expect("write");
        let toolchain = toolchain("true", "cat marker.txt");
        let output = toolchain.test(temp.path()).expect("test");
        assert!(output.success);
        assert_eq!(output.text, "here");
    }

    #[test]
    fn missing_binary_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let toolchain = CommandToolchain::from_config(&ToolchainConfig {
            build_command: vec!["definitely-not-a-real-binary-xyz".to_string()],
            ..ToolchainConfig::default()
        });
        let err = toolchain.build(temp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("run toolchain build"));
    }
}
