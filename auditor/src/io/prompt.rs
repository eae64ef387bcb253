//! Prompt templates for every oracle call made by the analysis loop.
//!
//! Each template is a markdown file split into role sections with
//! `<!-- role:system -->` / `<!-- role:user -->` markers. The sections are cut
//! from the template source once, and each one is rendered on its own, so
//! interpolated values never add or move a message boundary.

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use minijinja::{Environment, Value, context};
use regex::Regex;

use crate::io::oracle::{Message, Role};

const TEMPLATES: [(&str, &str); 6] = [
    ("refine_question", include_str!("prompts/refine_question.md")),
    ("generate_test", include_str!("prompts/generate_test.md")),
    ("refine_test", include_str!("prompts/refine_test.md")),
    ("repair_test", include_str!("prompts/repair_test.md")),
    ("repair_imports", include_str!("prompts/repair_imports.md")),
    ("analyze_failure", include_str!("prompts/analyze_failure.md")),
];

static ROLE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*role:(system|user)\s*-->").expect("role marker pattern should be valid")
});

/// One role section of a template, still unrendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Section {
    role: Role,
    source: &'static str,
}

/// The six prompt templates, registered once per run.
pub struct PromptBook {
    env: Environment<'static>,
    sections: HashMap<&'static str, Vec<Section>>,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBook {
    pub fn new() -> Self {
        let env = Environment::new();
        let mut sections = HashMap::new();
        for (name, source) in TEMPLATES {
            let parts = split_sections(source);
            for part in &parts {
                env.template_from_str(part.source)
                    .expect("prompt template should be valid");
            }
            sections.insert(name, parts);
        }
        Self { env, sections }
    }

    /// Narrow a free-form question to a security-testing question.
    pub fn refine_question(&self, question: &str, source_code: &str) -> Result<Vec<Message>> {
        self.render(
            "refine_question",
            context! { question => question.trim(), source_code => source_code },
        )
    }

    /// Produce a complete Foundry test for the contract.
    pub fn generate_test(
        &self,
        refined_question: &str,
        source_code: &str,
        source_path: &str,
    ) -> Result<Vec<Message>> {
        self.render(
            "generate_test",
            context! {
                refined_question => refined_question.trim(),
                source_code => source_code,
                source_path => source_path,
            },
        )
    }

    /// Review a freshly generated test.
    pub fn refine_test(&self, test_code: &str, refined_question: &str) -> Result<Vec<Message>> {
        self.render(
            "refine_test",
            context! { test_code => test_code, refined_question => refined_question.trim() },
        )
    }

    /// Fix a test script given toolchain output.
    pub fn repair_test(&self, error_output: &str, test_code: &str) -> Result<Vec<Message>> {
        self.render(
            "repair_test",
            context! { error_output => error_output.trim(), test_code => test_code },
        )
    }

    /// Fix unresolved import paths in the contract source.
    pub fn repair_imports(
        &self,
        error_output: &str,
        file_listing: &str,
        source_code: &str,
    ) -> Result<Vec<Message>> {
        self.render(
            "repair_imports",
            context! {
                error_output => error_output.trim(),
                file_listing => file_listing.trim(),
                source_code => source_code,
            },
        )
    }

    /// Explain why the tests failed.
    pub fn analyze_failure(
        &self,
        test_results: &str,
        question: &str,
        test_code: &str,
        source_code: &str,
    ) -> Result<Vec<Message>> {
        self.render(
            "analyze_failure",
            context! {
                test_results => test_results.trim(),
                question => question.trim(),
                test_code => test_code,
                source_code => source_code,
            },
        )
    }

    fn render(&self, name: &str, ctx: Value) -> Result<Vec<Message>> {
        let sections = self
            .sections
            .get(name)
            .ok_or_else(|| anyhow!("unknown prompt {name}"))?;
        let mut messages = Vec::with_capacity(sections.len());
        for section in sections {
            let rendered = self.env.render_str(section.source, ctx.clone())?;
            let content = rendered.trim();
            if content.is_empty() {
                continue;
            }
            messages.push(Message {
                role: section.role,
                content: content.to_string(),
            });
        }
        if messages.is_empty() {
            return Err(anyhow!("prompt {name} rendered no role sections"));
        }
        Ok(messages)
    }
}

/// Cut a template source into role sections at its markers.
///
/// Text before the first marker is ignored.
fn split_sections(source: &'static str) -> Vec<Section> {
    let markers: Vec<_> = ROLE_MARKER_RE.captures_iter(source).collect();
    let mut sections = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(role)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(source.len(), |m| m.start());
        let role = if role.as_str() == "system" {
            Role::System
        } else {
            Role::User
        };
        sections.push(Section {
            role,
            source: &source[whole.end()..end],
        });
    }
    sections
}
