//! Stripping of markdown fences that the oracle wraps around code.

use std::sync::LazyLock;

use regex::Regex;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*").expect("fence pattern should be valid")
});

/// Remove every code fence token (with or without a language tag) and trim.
///
/// Removal repeats until no fence remains, since deleting one token can join
/// surrounding backticks into a new one. This makes the function idempotent.
pub fn sanitize_code(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = FENCE_RE.replace_all(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        let raw = "```solidity\npragma solidity ^0.8.0;\ncontract A {}\n```\n";
        assert_eq!(sanitize_code(raw), "pragma solidity ^0.8.0;\ncontract A {}");
    }

    #[test]
    fn strips_any_language_tag() {
        for tag in ["Solidity", "js", "javascript", "c++", "sol_0_8"] {
            let raw = format!("```{tag}\ncontract A {{}}\n```");
            assert_eq!(sanitize_code(&raw), "contract A {}", "tag {tag:?}");
        }
    }

    #[test]
    fn strips_untagged_fence_and_whitespace() {
        let raw = "  \n```\ncontract A {}\n```  ";
        assert_eq!(sanitize_code(raw), "contract A {}");
    }

    #[test]
    fn leaves_plain_code_untouched() {
        let raw = "contract A {}";
        assert_eq!(sanitize_code(raw), raw);
    }

    #[test]
    fn removes_fences_formed_by_removal() {
        let raw = "``````solidity`contract A {}";
        let once = sanitize_code(raw);
        assert!(!once.contains("```"));
        assert_eq!(sanitize_code(&once), once);
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "```",
            "``` ```",
            "```sol\nx\n```",
            "`` ```solidity` y",
            "text\n```solidity\ncode\n```\nmore text",
            "```solsolidity```",
        ];
        for sample in samples {
            let once = sanitize_code(sample);
            assert_eq!(sanitize_code(&once), once, "sample {sample:?}");
        }
    }
}
