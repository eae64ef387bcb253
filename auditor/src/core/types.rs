//! Shared deterministic types for the analysis loop.
//!
//! These types define the contracts between the controller, the oracle and the
//! toolchain adapter. They carry no I/O and serialize to stable shapes.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// `result` field of a passing verdict payload.
pub const PASS_RESULT: &str = "All tests passed";
/// `details` field of a passing verdict payload.
pub const PASS_DETAILS: &str = "No vulnerabilities detected based on the current tests.";

/// Immutable input to one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Free-form question about the contract's behavior.
    pub question: String,
    /// Contract source as submitted.
    pub source_code: String,
}

impl AnalysisRequest {
    /// Reject requests with nothing to analyze.
    pub fn validate(&self) -> Result<()> {
        if self.source_code.trim().is_empty() {
            bail!("source_code must be non-empty");
        }
        if self.question.trim().is_empty() {
            bail!("question must be non-empty");
        }
        Ok(())
    }
}

/// Stable identifier derived from the submitted source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractIdentity {
    pub name: String,
}

impl ContractIdentity {
    /// File name of the working source, e.g. `Vault.sol`.
    pub fn source_file_name(&self, extension: &str) -> String {
        format!("{}{}", self.name, extension)
    }

    /// File name of the working test, e.g. `VaultTest.t.sol`.
    pub fn test_file_name(&self, extension: &str) -> String {
        format!("{}Test.t{}", self.name, extension)
    }
}

/// Combined stdout/stderr of one build or test invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainOutput {
    pub text: String,
    /// Exit status of the invocation (`false` on non-zero exit or timeout).
    pub success: bool,
}

impl ToolchainOutput {
    pub fn succeeded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

/// Loop stage that gave up on repairing the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    /// Test-code repair inside the build loop.
    Build,
    /// Import-path repair inside the build loop.
    ImportPath,
    /// Build re-check after the build loop reported success.
    VerifyBuild,
    /// Test-script repair inside the test loop.
    Test,
}

impl RepairStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RepairStage::Build => "build",
            RepairStage::ImportPath => "import_path",
            RepairStage::VerifyBuild => "verify_build",
            RepairStage::Test => "test",
        }
    }
}

/// Final output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Tests passed (possibly after repairs); no vulnerability found.
    Passed,
    /// Tests kept failing; `analysis` explains why.
    Vulnerable { analysis: String },
    /// The loop could not produce a buildable/runnable test.
    Unrepairable {
        stage: RepairStage,
        reason: String,
        last_output: String,
    },
}

/// Number of oracle repairs applied per loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCounts {
    pub build: u32,
    pub import_path: u32,
    pub test: u32,
}

impl RepairCounts {
    pub fn total(&self) -> u32 {
        self.build + self.import_path + self.test
    }
}
