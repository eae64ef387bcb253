//! Deterministic classification of toolchain output.
//!
//! The toolchain's diagnostics are not consistently structured, so classification
//! is driven by fixed trigger substrings. The build exit status is consulted only
//! when no trigger matched.

use crate::core::types::ToolchainOutput;

pub const ERROR_MARKER: &str = "Error";
pub const WARNING_MARKER: &str = "Warning";
pub const MISSING_FILE_MARKER: &str = "File not found";
pub const TEST_FAILURE_MARKER: &str = "FAIL";
pub const COMPILER_FAILED_MARKER: &str = "Compiler run failed:";
pub const REVERT_MARKER: &str = "revert";

/// Substrings that make a failing test run eligible for test-script repair.
pub const TEST_REPAIR_TRIGGERS: [&str; 3] =
    [MISSING_FILE_MARKER, COMPILER_FAILED_MARKER, REVERT_MARKER];

/// What the build loop should do with one build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildDiagnosis {
    /// Nothing to repair; the build loop terminates.
    Clean,
    /// Errors or warnings attributed to the test script.
    CodeDefect,
    /// An import could not be resolved.
    MissingImport,
}

/// What the test loop should do with one test output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestDiagnosis {
    /// No failing test.
    Passed,
    /// Failing, and the failure looks like a defect of the test script itself.
    Repairable,
    /// Failing for reasons the test script does not explain.
    Failing,
}

/// Classify one build invocation.
///
/// - `MissingImport` if the output mentions `File not found`.
/// - `CodeDefect` if it mentions `Error` or `Warning`, or if the build exited
///   unsuccessfully without any recognised marker.
/// - `Clean` otherwise.
pub fn classify_build(output: &ToolchainOutput) -> BuildDiagnosis {
    let text = output.text.as_str();
    if text.contains(MISSING_FILE_MARKER) {
        return BuildDiagnosis::MissingImport;
    }
    if text.contains(ERROR_MARKER) || text.contains(WARNING_MARKER) {
        return BuildDiagnosis::CodeDefect;
    }
    if !output.success {
        return BuildDiagnosis::CodeDefect;
    }
    BuildDiagnosis::Clean
}

/// Whether a build re-check still reports errors (warnings are tolerated).
pub fn build_has_errors(output: &ToolchainOutput) -> bool {
    output.text.contains(ERROR_MARKER) || !output.success
}

/// Classify one test invocation by its text.
pub fn classify_test(text: &str) -> TestDiagnosis {
    if !text.contains(TEST_FAILURE_MARKER) {
        return TestDiagnosis::Passed;
    }
    if TEST_REPAIR_TRIGGERS
        .iter()
        .any(|trigger| text.contains(trigger))
    {
        TestDiagnosis::Repairable
    } else {
        TestDiagnosis::Failing
    }
}
