//! End-to-end tests for complete analysis runs with scripted collaborators.
//!
//! These drive `run_analysis` through the public API and check what a run leaves
//! behind on disk: archived artifacts, empty working roots and the progress
//! messages observers see.

use auditor::analyze::run_analysis;
use auditor::core::types::{AnalysisRequest, RepairStage, ToolchainOutput, Verdict};
use auditor::io::oracle::Role;
use auditor::test_support::{
    RecordingNotifier, ScriptedOracle, ScriptedToolchain, TestProject, ToolchainCall,
};

const BANK: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

contract Bank {
    mapping(address => uint256) public balances;

    function withdraw(uint256 amount) external {
        (bool ok, ) = msg.sender.call{value: amount}("");
        require(ok);
        balances[msg.sender] -= amount;
    }
}
"#;

const BANK_TEST: &str = r#"pragma solidity ^0.8.20;
import "forge-std/Test.sol";
import "../src/Bank.sol";

contract BankTest is Test {
    function testReentrancy() public {}
}"#;

fn request() -> AnalysisRequest {
    AnalysisRequest {
        question: "Is withdraw vulnerable to reentrancy?".to_string(),
        source_code: BANK.to_string(),
    }
}

/// Full lifecycle: one build repair, one test repair, then a plain failure that
/// is analyzed and archived.
///
/// Sequence:
/// 1. refine question, generate test, refine test (fenced reply)
/// 2. build reports an error -> test repaired
/// 3. build clean, verify clean
/// 4. tests revert -> test repaired
/// 5. tests fail on an assertion -> analysis
#[test]
fn full_lifecycle_repairs_then_analyzes() {
    let project = TestProject::new().expect("project");
    let workspace = project.workspace().expect("workspace");
    let oracle = ScriptedOracle::new([
        "Can an attacker re-enter withdraw before balances are updated?".to_string(),
        format!("```solidity\n{BANK_TEST}\n```"),
        format!("```solidity\n{BANK_TEST}\n```"),
        format!("```solidity\n{BANK_TEST}\n// fixed import\n```"),
        format!("```solidity\n{BANK_TEST}\n// fixed revert\n```"),
        "withdraw sends ether before updating balances, so it is reentrant.".to_string(),
    ]);
    let toolchain = ScriptedToolchain::new(
        vec![
            ToolchainOutput::failed("Error (7576): Undeclared identifier \"attacker\"."),
            ToolchainOutput::succeeded("Compiler run successful!"),
            ToolchainOutput::succeeded("Compiler run successful!"),
        ],
        vec![
            ToolchainOutput::failed("[FAIL. Reason: revert: insufficient] testReentrancy()"),
            ToolchainOutput::failed("[FAIL. Reason: assertion failed] testReentrancy()"),
        ],
    );
    let notifier = RecordingNotifier::default();

    let outcome = run_analysis(
        &workspace,
        &request(),
        &oracle,
        &toolchain,
        &notifier,
        &project.repair(),
    )
    .expect("analysis");
    workspace.finish().expect("finish");

    assert_eq!(outcome.identity.name, "Bank");
    assert_eq!(
        outcome.verdict,
        Verdict::Vulnerable {
            analysis: "withdraw sends ether before updating balances, so it is reentrant."
                .to_string()
        }
    );
    assert_eq!(outcome.repairs.build, 1);
    assert_eq!(outcome.repairs.test, 1);
    assert_eq!(oracle.remaining(), 0);
    assert_eq!(
        toolchain.calls(),
        vec![
            ToolchainCall::Build,
            ToolchainCall::Build,
            ToolchainCall::Build,
            ToolchainCall::Test,
            ToolchainCall::Test,
        ]
    );

    assert_eq!(
        project.file_names("contracts"),
        vec!["Bank.sol", "BankTest.t.sol"]
    );
    assert!(project.file_names("src").is_empty());
    assert!(project.file_names("test").is_empty());
    let archived_test = project.read("contracts/BankTest.t.sol").expect("read test");
    assert!(archived_test.ends_with("// fixed revert"));
    assert!(!archived_test.contains("```"));

    let analysis_prompt = oracle.calls().pop().expect("analysis prompt");
    assert_eq!(analysis_prompt[0].role, Role::System);
    assert!(analysis_prompt[1].content.contains("// fixed revert"));
    assert!(analysis_prompt[1].content.contains("Is withdraw vulnerable to reentrancy?"));

    let messages = notifier.messages();
    let position = |needle: &str| {
        messages
            .iter()
            .position(|m| m.contains(needle))
            .unwrap_or_else(|| panic!("missing notification {needle:?}"))
    };
    assert!(position("Generated Test:") < position("Refined Test:"));
    assert!(position("Refined Test:") < position("Build Error Detected. Attempting to Fix..."));
    assert!(position("Build Successful.") < position("Forge Test Results:"));
    assert!(position("Re-run Forge Test Results:") < position("Moved Bank.sol"));
    assert!(position("Cleared contents of") < position("reentrant"));
}

/// A second run in the same project starts from empty working roots and adds
/// its own artifacts to the archive.
#[test]
fn consecutive_runs_share_the_archive() {
    let project = TestProject::new().expect("project");
    for (name, source) in [("First", "contract First {}"), ("Second", "contract Second {}")] {
        let workspace = project.workspace().expect("workspace");
        let oracle = ScriptedOracle::new(["q", "t", "contract T {}"]);
        let toolchain = ScriptedToolchain::new(
            vec![
                ToolchainOutput::succeeded("ok"),
                ToolchainOutput::succeeded("ok"),
            ],
            vec![ToolchainOutput::succeeded("[PASS] testA()")],
        );
        let request = AnalysisRequest {
            question: "Safe?".to_string(),
            source_code: source.to_string(),
        };
        let outcome = run_analysis(
            &workspace,
            &request,
            &oracle,
            &toolchain,
            &RecordingNotifier::default(),
            &project.repair(),
        )
        .expect("analysis");
        assert_eq!(outcome.identity.name, name);
        assert_eq!(outcome.verdict, Verdict::Passed);
        assert!(project.file_names("src").is_empty());
    }
    assert_eq!(
        project.file_names("contracts"),
        vec!["First.sol", "FirstTest.t.sol", "Second.sol", "SecondTest.t.sol"]
    );
}

/// An unrepairable run leaves nothing behind: no archive, empty roots.
#[test]
fn unrepairable_run_discards_artifacts() {
    let mut project = TestProject::new().expect("project");
    project.config.repair.max_build_repairs = 1;
    let workspace = project.workspace().expect("workspace");
    let oracle = ScriptedOracle::new(["q", "t", "contract T {}", "contract T { }"]);
    let toolchain = ScriptedToolchain::new(
        vec![
            ToolchainOutput::failed("Error (2314): Expected ';'"),
            ToolchainOutput::failed("Error (2314): Expected ';'"),
        ],
        Vec::new(),
    );

    let outcome = run_analysis(
        &workspace,
        &request(),
        &oracle,
        &toolchain,
        &RecordingNotifier::default(),
        &project.repair(),
    )
    .expect("analysis");

    assert!(matches!(
        outcome.verdict,
        Verdict::Unrepairable {
            stage: RepairStage::Build,
            ..
        }
    ));
    assert!(outcome.archived.is_empty());
    assert!(project.file_names("contracts").is_empty());
    assert!(project.file_names("src").is_empty());
    assert!(project.file_names("test").is_empty());
}
