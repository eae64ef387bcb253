//! Scripted fakes and fixtures for exercising the analysis loop without a
//! language model or a real toolchain.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::ToolchainOutput;
use crate::io::config::{AuditorConfig, RepairConfig};
use crate::io::oracle::{Message, Oracle};
use crate::io::toolchain::Toolchain;
use crate::io::workspace::RunWorkspace;
use crate::notify::Notifier;

/// Oracle that replays queued replies in order and records every prompt.
///
/// An `Err` entry is returned as a transport failure. Running out of replies is
/// an error too, so a test that expects fewer oracle calls fails loudly.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure after the replies already scripted.
    pub fn then_fail(self, message: &str) -> Self {
        lock(&self.replies).push_back(Err(message.to_string()));
        self
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

impl Oracle for ScriptedOracle {
    fn complete(&self, messages: &[Message]) -> Result<String> {
        lock(&self.calls).push(messages.to_vec());
        match lock(&self.replies).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted oracle has no reply left")),
        }
    }
}

/// Toolchain invocation recorded by [`ScriptedToolchain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainCall {
    Build,
    Test,
}

/// Toolchain that replays queued build and test outputs.
#[derive(Debug, Default)]
pub struct ScriptedToolchain {
    builds: Mutex<VecDeque<ToolchainOutput>>,
    tests: Mutex<VecDeque<ToolchainOutput>>,
    calls: Mutex<Vec<ToolchainCall>>,
    roots: Mutex<Vec<PathBuf>>,
}

impl ScriptedToolchain {
    pub fn new(builds: Vec<ToolchainOutput>, tests: Vec<ToolchainOutput>) -> Self {
        Self {
            builds: Mutex::new(builds.into()),
            tests: Mutex::new(tests.into()),
            calls: Mutex::new(Vec::new()),
            roots: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ToolchainCall> {
        lock(&self.calls).clone()
    }

    pub fn build_count(&self) -> usize {
        self.count(ToolchainCall::Build)
    }

    pub fn test_count(&self) -> usize {
        self.count(ToolchainCall::Test)
    }

    /// Project roots the toolchain was invoked in.
    pub fn roots(&self) -> Vec<PathBuf> {
        lock(&self.roots).clone()
    }

    fn count(&self, kind: ToolchainCall) -> usize {
        lock(&self.calls).iter().filter(|c| **c == kind).count()
    }

    fn next(
        &self,
        kind: ToolchainCall,
        queue: &Mutex<VecDeque<ToolchainOutput>>,
        root: &Path,
    ) -> Result<ToolchainOutput> {
        lock(&self.calls).push(kind);
        lock(&self.roots).push(root.to_path_buf());
        lock(queue)
            .pop_front()
            .ok_or_else(|| anyhow!("scripted toolchain has no {kind:?} output left"))
    }
}

impl Toolchain for ScriptedToolchain {
    fn build(&self, project_root: &Path) -> Result<ToolchainOutput> {
        self.next(ToolchainCall::Build, &self.builds, project_root)
    }

    fn test(&self, project_root: &Path) -> Result<ToolchainOutput> {
        self.next(ToolchainCall::Test, &self.tests, project_root)
    }
}

/// Notifier that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.messages).iter().any(|m| m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, message: &str) {
        lock(&self.messages).push(message.to_string());
    }
}

/// Temporary project directory with the default layout.
pub struct TestProject {
    temp: TempDir,
    pub config: AuditorConfig,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp project")?;
        fs::write(temp.path().join("foundry.toml"), "[profile.default]\n")
            .context("write foundry.toml")?;
        Ok(Self {
            temp,
            config: AuditorConfig::default(),
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn repair(&self) -> RepairConfig {
        self.config.repair
    }

    /// Open a workspace with the project's current config.
    pub fn workspace(&self) -> Result<RunWorkspace> {
        RunWorkspace::open(self.path(), &self.config)
    }

    /// Sorted file names directly inside `rel` (empty if it does not exist).
    pub fn file_names(&self, rel: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.path().join(rel)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
