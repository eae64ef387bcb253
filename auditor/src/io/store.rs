//! Artifact store: the write/move/clear operations the analysis loop relies on.
//!
//! `write_artifact` propagates failures to the caller. `move_files` and
//! `clear_directory` are best-effort: failures are reported through the
//! notifier and returned as data, never as errors.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::notify::Notifier;

/// Directory names left out of project listings.
const LISTING_SKIP_DIRS: [&str; 5] = [".git", ".auditor", "out", "cache", "node_modules"];
const LISTING_MAX_DEPTH: usize = 4;

/// Overwrite `path` with `content`. The parent directory must exist.
pub fn write_artifact(path: &Path, content: &str, notifier: &dyn Notifier) -> Result<()> {
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "artifact written");
    notifier.emit(&format!("Content written to {}", path.display()));
    Ok(())
}

/// Outcome of a best-effort move.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Destination paths of files that were moved.
    pub moved: Vec<PathBuf>,
    /// One message per file (or directory scan) that failed.
    pub failures: Vec<String>,
}

impl MoveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Move every regular file in `source_dir` whose name ends with `extension` into
/// `destination_dir`, creating it if absent. Existing destination files are replaced.
pub fn move_files(
    source_dir: &Path,
    destination_dir: &Path,
    extension: &str,
    notifier: &dyn Notifier,
) -> MoveReport {
    let mut report = MoveReport::default();

    if let Err(err) = fs::create_dir_all(destination_dir) {
        report
            .failures
            .push(format!("create {}: {err}", destination_dir.display()));
    } else {
        match fs::read_dir(source_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
                    else {
                        continue;
                    };
                    if !name.ends_with(extension) || !path.is_file() {
                        continue;
                    }
                    let target = destination_dir.join(&name);
                    match relocate(&path, &target) {
                        Ok(()) => {
                            notifier.emit(&format!(
                                "Moved {name} to {}",
                                destination_dir.display()
                            ));
                            report.moved.push(target);
                        }
                        Err(err) => report.failures.push(format!("{name}: {err:#}")),
                    }
                }
            }
            Err(err) => report
                .failures
                .push(format!("read {}: {err}", source_dir.display())),
        }
    }

    if !report.is_complete() {
        warn!(failures = report.failures.len(), "move incomplete");
        notifier.emit(&format!(
            "Error occurred while moving files: {}",
            report.failures.join("; ")
        ));
    }
    report
}

/// Rename, falling back to copy + delete across filesystems.
fn relocate(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).with_context(|| format!("copy to {}", to.display()))?;
    fs::remove_file(from).with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}

/// Remove every immediate child of `dir` (files, symlinks, subdirectories) and
/// keep `dir` itself. Returns whether everything was removed.
pub fn clear_directory(dir: &Path, notifier: &dyn Notifier) -> bool {
    let mut failures = Vec::new();
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                let result = match fs::symlink_metadata(&path) {
                    Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
                    Ok(_) => fs::remove_file(&path),
                    Err(err) => Err(err),
                };
                if let Err(err) = result {
                    failures.push(format!("{}: {err}", path.display()));
                }
            }
        }
        Err(err) => failures.push(format!("read {}: {err}", dir.display())),
    }

    if failures.is_empty() {
        notifier.emit(&format!("Cleared contents of {}", dir.display()));
        return true;
    }
    warn!(dir = %dir.display(), failures = failures.len(), "clear incomplete");
    notifier.emit(&format!(
        "Error occurred while clearing directory contents: {}",
        failures.join("; ")
    ));
    false
}

/// Sorted, root-relative listing of project files for import-path repair.
///
/// Build outputs and VCS metadata are skipped; linked dependency directories
/// are followed up to a fixed depth.
pub fn list_project_files(root: &Path) -> String {
    let mut lines: Vec<String> = WalkDir::new(root)
        .follow_links(true)
        .max_depth(LISTING_MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && LISTING_SKIP_DIRS
                        .iter()
                        .any(|skip| entry.file_name() == *skip))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.depth() > 0)
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let mut line = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                line.push('/');
            }
            Some(line)
        })
        .collect();
    lines.sort();
    lines.join("\n")
}
