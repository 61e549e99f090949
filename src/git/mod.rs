//! Read-only git queries for the review pipeline.
//!
//! Everything here shells out to the `git` binary and parses stdout — no
//! libgit2, no repository state is ever modified. Concurrent invocations
//! against the same working tree are safe to interleave.

use std::path::Path;
use tokio::process::Command;

/// Errors from the diff accessor. None of these are retried — the user
/// retries by committing again or fixing repository state.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("no git repository found at {0}")]
    NoWorkspace(String),
    #[error("git invocation failed: {stderr}")]
    Unavailable { stderr: String },
    #[error("failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),
}

async fn run_git(workspace: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::Unavailable { stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ensure_workspace(workspace: &Path) -> Result<(), GitError> {
    if !workspace.join(".git").exists() {
        return Err(GitError::NoWorkspace(workspace.display().to_string()));
    }
    Ok(())
}

/// Total number of commits reachable from HEAD.
///
/// A repository with no commits at all (`git rev-list` fails on an unborn
/// HEAD) counts as zero.
pub async fn commit_count(workspace: &Path) -> Result<u64, GitError> {
    ensure_workspace(workspace)?;
    match run_git(workspace, &["rev-list", "--count", "HEAD"]).await {
        Ok(out) => Ok(out.trim().parse().unwrap_or(0)),
        Err(GitError::Unavailable { stderr }) if stderr.contains("unknown revision") => Ok(0),
        Err(e) => Err(e),
    }
}

/// Diff of the most recent commit against its parent.
///
/// Returns `Ok(None)` when HEAD has no parent (first commit, or an empty
/// repository) — a legitimate "nothing to review" state, not an error.
pub async fn last_commit_diff(workspace: &Path) -> Result<Option<String>, GitError> {
    ensure_workspace(workspace)?;

    if commit_count(workspace).await? <= 1 {
        tracing::info!("HEAD has no parent commit — nothing to diff");
        return Ok(None);
    }

    let diff = run_git(workspace, &["diff", "HEAD~1", "HEAD"]).await?;
    if diff.trim().is_empty() {
        // An empty commit diffs to nothing; treat like the no-parent case.
        return Ok(None);
    }
    Ok(Some(diff))
}
