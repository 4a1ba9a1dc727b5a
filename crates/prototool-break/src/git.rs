use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::BreakError;

#[derive(Debug, Clone)]
pub enum GitRef {
    Branch(String),
    Tag(String),
}

impl GitRef {
    pub fn name(&self) -> &str {
        match self {
            GitRef::Branch(name) | GitRef::Tag(name) => name,
        }
    }
}

/// A baseline checkout of the repository at a ref. The temp
/// directory lives as long as this value.
pub struct GitBaseline {
    _dir: TempDir,
    /// Repository top level of the original worktree.
    pub worktree_root: PathBuf,
    /// Root of the baseline clone.
    pub baseline_root: PathBuf,
}

impl GitBaseline {
    /// Map a path under the current worktree to its baseline
    /// counterpart.
    pub fn baseline_path(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.worktree_root) {
            Ok(rel) => self.baseline_root.join(rel),
            Err(_) => self.baseline_root.clone(),
        }
    }
}

/// Shallow-clone the repository containing `dir` at `reference` into
/// a temp directory.
pub async fn checkout_baseline(dir: &Path, reference: &GitRef) -> Result<GitBaseline, BreakError> {
    let toplevel = git_output(dir, &["rev-parse", "--show-toplevel"])
        .await
        .map_err(|_| BreakError::NotARepository(dir.display().to_string()))?;
    let worktree_root = PathBuf::from(toplevel.trim());

    let tmp = TempDir::with_prefix("prototool-break-")?;
    let baseline_root = tmp.path().join("baseline");
    let url = format!("file://{}", worktree_root.display());
    debug!(reference = reference.name(), url = url.as_str(), "cloning baseline");
    git_output(
        dir,
        &[
            "clone",
            "--depth",
            "1",
            "--branch",
            reference.name(),
            &url,
            &baseline_root.display().to_string(),
        ],
    )
    .await?;

    Ok(GitBaseline {
        _dir: tmp,
        worktree_root,
        baseline_root,
    })
}

async fn git_output(dir: &Path, args: &[&str]) -> Result<String, BreakError> {
    let output = tokio::process::Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .await?;
    if !output.status.success() {
        return Err(BreakError::Git {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
