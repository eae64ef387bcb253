//! Auditor configuration stored in `auditor.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved relative to the project directory.
pub const CONFIG_FILE_NAME: &str = "auditor.toml";

/// Auditor configuration (TOML).
///
/// Missing sections and fields fall back to the defaults below, which reproduce
/// the fixed generation parameters and Foundry layout the loop was built around.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditorConfig {
    pub oracle: OracleConfig,
    pub toolchain: ToolchainConfig,
    pub layout: LayoutConfig,
    pub repair: RepairConfig,
    pub workspace: WorkspaceConfig,
}

/// Chat-completion endpoint and fixed sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f64,
    pub top_p: f64,
    pub seed: u64,
    pub max_tokens: u32,
    /// HTTP timeout for a single completion.
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-1106-preview".to_string(),
            api_key_env: "OPENAI_TOKEN".to_string(),
            temperature: 0.2,
            top_p: 0.1,
            seed: 32526,
            max_tokens: 1000,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Command compiling the project (e.g. `["forge","build"]`).
    pub build_command: Vec<String>,
    /// Command running the project's tests (e.g. `["forge","test"]`).
    pub test_command: Vec<String>,
    pub timeout_secs: u64,
    /// Truncate each of stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            build_command: vec!["forge".to_string(), "build".to_string()],
            test_command: vec!["forge".to_string(), "test".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 200_000,
        }
    }
}

/// Directory names under the project (or run workspace) root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub src_dir: PathBuf,
    pub test_dir: PathBuf,
    /// Archive root; always resolved against the project root, never a run workspace.
    pub archive_dir: PathBuf,
    pub source_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            test_dir: PathBuf::from("test"),
            archive_dir: PathBuf::from("contracts"),
            source_extension: ".sol".to_string(),
        }
    }
}

/// Maximum oracle repairs per loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepairConfig {
    pub max_build_repairs: u32,
    pub max_import_repairs: u32,
    pub max_test_repairs: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_build_repairs: 5,
            max_import_repairs: 3,
            max_test_repairs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Give every run its own directory instead of the shared project roots.
    pub isolate: bool,
    /// Parent of isolated run directories, relative to the project root.
    pub runs_dir: PathBuf,
    /// Project entries linked into each isolated run directory.
    pub shared_entries: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            isolate: false,
            runs_dir: PathBuf::from(".auditor/runs"),
            shared_entries: vec![
                "foundry.toml".to_string(),
                "remappings.txt".to_string(),
                "lib".to_string(),
            ],
        }
    }
}

impl AuditorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.oracle.model.trim().is_empty() {
            return Err(anyhow!("oracle.model must be non-empty"));
        }
        if self.oracle.api_key_env.trim().is_empty() {
            return Err(anyhow!("oracle.api_key_env must be non-empty"));
        }
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(anyhow!("oracle.temperature must be within 0.0..=2.0"));
        }
        if !(0.0..=1.0).contains(&self.oracle.top_p) {
            return Err(anyhow!("oracle.top_p must be within 0.0..=1.0"));
        }
        if self.oracle.max_tokens == 0 {
            return Err(anyhow!("oracle.max_tokens must be > 0"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow!("oracle.timeout_secs must be > 0"));
        }
        validate_command("toolchain.build_command", &self.toolchain.build_command)?;
        validate_command("toolchain.test_command", &self.toolchain.test_command)?;
        if self.toolchain.timeout_secs == 0 {
            return Err(anyhow!("toolchain.timeout_secs must be > 0"));
        }
        if self.toolchain.output_limit_bytes == 0 {
            return Err(anyhow!("toolchain.output_limit_bytes must be > 0"));
        }
        if !self.layout.source_extension.starts_with('.') {
            return Err(anyhow!("layout.source_extension must start with '.'"));
        }
        if self.layout.src_dir == self.layout.test_dir {
            return Err(anyhow!("layout.src_dir and layout.test_dir must differ"));
        }
        Ok(())
    }
}

fn validate_command(label: &str, command: &[String]) -> Result<()> {
    if command.is_empty() || command[0].trim().is_empty() {
        return Err(anyhow!("{label} must be a non-empty array"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AuditorConfig::default()`.
pub fn load_config(path: &Path) -> Result<AuditorConfig> {
    if !path.exists() {
        let cfg = AuditorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AuditorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AuditorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AuditorConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("auditor.toml");
        let mut cfg = AuditorConfig::default();
        cfg.repair.max_test_repairs = 9;
        cfg.workspace.isolate = true;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("auditor.toml");
        fs::write(&path, "[repair]\nmax_build_repairs = 1\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.repair.max_build_repairs, 1);
        assert_eq!(cfg.repair.max_test_repairs, 5);
        assert_eq!(cfg.oracle.seed, 32526);
        assert_eq!(cfg.toolchain.build_command, vec!["forge", "build"]);
    }

    #[test]
    fn rejects_empty_build_command() {
        let mut cfg = AuditorConfig::default();
        cfg.toolchain.build_command = Vec::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("toolchain.build_command"));
    }

    #[test]
    fn rejects_out_of_range_top_p() {
        let mut cfg = AuditorConfig::default();
        cfg.oracle.top_p = 1.5;
        assert!(cfg.validate().is_err());
    }
}
