//! Run workspaces: the directory roots one analysis run owns.
//!
//! A shared workspace uses the project's own source/test roots, so the caller
//! must not start two runs at once. An isolated workspace gives each run a fresh
//! directory under `runs_dir` with the project's toolchain files linked in,
//! which makes concurrent runs safe. Both archive into the project's archive root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, info};

use crate::core::types::ContractIdentity;
use crate::io::config::{AuditorConfig, LayoutConfig, WorkspaceConfig};

/// Directory handle for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    root: PathBuf,
    src_dir: PathBuf,
    test_dir: PathBuf,
    archive_dir: PathBuf,
    source_extension: String,
    isolated: bool,
}

impl RunWorkspace {
    /// Open the workspace the config asks for.
    pub fn open(project_root: &Path, cfg: &AuditorConfig) -> Result<Self> {
        if cfg.workspace.isolate {
            Self::isolated(project_root, &cfg.layout, &cfg.workspace)
        } else {
            Self::shared(project_root, &cfg.layout)
        }
    }

    /// Use the project's own roots.
    pub fn shared(project_root: &Path, layout: &LayoutConfig) -> Result<Self> {
        let workspace = Self::at(project_root, project_root, layout, false);
        workspace.ensure_roots()?;
        Ok(workspace)
    }

    /// Create a fresh run directory under `runs_dir`.
    pub fn isolated(
        project_root: &Path,
        layout: &LayoutConfig,
        ws: &WorkspaceConfig,
    ) -> Result<Self> {
        let runs_dir = project_root.join(&ws.runs_dir);
        fs::create_dir_all(&runs_dir)
            .with_context(|| format!("create runs dir {}", runs_dir.display()))?;

        let name = build_run_name(&generate_timestamp(), &generate_short_id());
        let root = runs_dir.join(&name);
        fs::create_dir(&root).with_context(|| format!("create run dir {}", root.display()))?;

        for entry in &ws.shared_entries {
            let source = project_root.join(entry);
            if !source.exists() {
                debug!(entry = %entry, "shared entry missing, skipping");
                continue;
            }
            link_entry(&source, &root.join(entry))
                .with_context(|| format!("link shared entry {entry}"))?;
        }

        let workspace = Self::at(&root, project_root, layout, true);
        workspace.ensure_roots()?;
        info!(root = %root.display(), "created isolated run workspace");
        Ok(workspace)
    }

    fn at(root: &Path, project_root: &Path, layout: &LayoutConfig, isolated: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            src_dir: root.join(&layout.src_dir),
            test_dir: root.join(&layout.test_dir),
            archive_dir: project_root.join(&layout.archive_dir),
            source_extension: layout.source_extension.clone(),
            isolated,
        }
    }

    fn ensure_roots(&self) -> Result<()> {
        for dir in [&self.src_dir, &self.test_dir] {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Directory the toolchain runs in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    pub fn source_path(&self, identity: &ContractIdentity) -> PathBuf {
        self.src_dir
            .join(identity.source_file_name(&self.source_extension))
    }

    pub fn test_path(&self, identity: &ContractIdentity) -> PathBuf {
        self.test_dir
            .join(identity.test_file_name(&self.source_extension))
    }

    /// Source path as the test script should reference it (root-relative).
    pub fn relative_source_path(&self, identity: &ContractIdentity) -> String {
        let path = self.source_path(identity);
        path.strip_prefix(&self.root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Release the workspace. Isolated run directories are deleted; shared
    /// roots are left to the analysis loop's own archive/clear step.
    pub fn finish(self) -> Result<()> {
        if !self.isolated {
            return Ok(());
        }
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("remove run dir {}", self.root.display()))?;
        debug!(root = %self.root.display(), "removed isolated run workspace");
        Ok(())
    }
}

pub fn build_run_name(timestamp: &str, short_id: &str) -> String {
    format!("run_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(unix)]
fn link_entry(source: &Path, target: &Path) -> Result<()> {
    let source = source
        .canonicalize()
        .with_context(|| format!("resolve {}", source.display()))?;
    std::os::unix::fs::symlink(&source, target)
        .with_context(|| format!("symlink {} -> {}", target.display(), source.display()))
}

#[cfg(not(unix))]
fn link_entry(source: &Path, target: &Path) -> Result<()> {
    use anyhow::anyhow;
    use tracing::warn;
    use walkdir::WalkDir;

    if source.is_file() {
        fs::copy(source, target).with_context(|| format!("copy {}", source.display()))?;
        return Ok(());
    }
    warn!(source = %source.display(), "symlinks unavailable, copying directory");
    for entry in WalkDir::new(source) {
        let entry = entry.context("walk shared entry")?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| anyhow!("entry outside {}", source.display()))?;
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).with_context(|| format!("create {}", dest.display()))?;
        } else {
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
