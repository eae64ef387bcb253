//! Investigation tests for the chat-completions oracle.
//!
//! # Prerequisites
//!
//! - API key in the variable named by `oracle.api_key_env` (default `OPENAI_TOKEN`)
//! - Network access to `oracle.api_base`

use auditor::core::sanitize::sanitize_code;
use auditor::io::config::OracleConfig;
use auditor::io::oracle::{OpenAiOracle, Oracle};
use auditor::io::prompt::PromptBook;

fn oracle() -> OpenAiOracle {
    dotenvy::dotenv().ok();
    OpenAiOracle::from_config(&OracleConfig::default()).expect("oracle credentials")
}

/// The refine-question prompt returns a non-empty question.
#[test]
#[ignore]
fn refine_question_returns_text() {
    let prompts = PromptBook::new();
    let messages = prompts
        .refine_question(
            "Is this safe?",
            "contract Vault { mapping(address => uint256) b; function w() external { payable(msg.sender).transfer(b[msg.sender]); b[msg.sender] = 0; } }",
        )
        .expect("render");

    let reply = oracle().complete(&messages).expect("completion");
    println!("{reply}");
    assert!(!reply.trim().is_empty());
}

/// Generated tests sanitize to Solidity without fences.
#[test]
#[ignore]
fn generated_test_sanitizes_to_solidity() {
    let prompts = PromptBook::new();
    let messages = prompts
        .generate_test(
            "Can the counter overflow?",
            "pragma solidity ^0.8.20;\ncontract Counter { uint8 public n; function inc() external { n += 1; } }",
            "src/Counter.sol",
        )
        .expect("render");

    let reply = oracle().complete(&messages).expect("completion");
    let code = sanitize_code(&reply);
    println!("{code}");
    assert!(!code.contains("```"));
    assert!(code.contains("contract"));
}
