//! Read-only git queries used to resolve triggers and repository identity.
//!
//! Shells out to `git` in the project root, so the user's configuration
//! (remotes, `safe.directory`, worktrees) applies. Commands that change the
//! repository go through [`ToolRunner`](crate::runner::ToolRunner) instead.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git queries.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "rev-parse").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git queries.
pub type GitResult<T> = Result<T, GitError>;

/// The git directory shared by every worktree of the repository holding
/// `root`, or `None` outside a repository.
#[instrument]
pub fn git_common_dir(root: &Utf8Path) -> GitResult<Option<Utf8PathBuf>> {
    match git(root, &["rev-parse", "--git-common-dir"]) {
        Ok(output) => {
            // Relative output is relative to the working directory.
            let dir = Utf8PathBuf::from(output.trim());
            let dir = if dir.is_absolute() { dir } else { root.join(dir) };
            debug!(%dir, "git common dir");
            Ok(Some(dir))
        }
        Err(GitError::NotARepo) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The checked-out branch, or `None` on a detached HEAD.
#[instrument]
pub fn current_branch(root: &Utf8Path) -> GitResult<Option<String>> {
    let output = git(root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" {
        debug!("detached HEAD");
        Ok(None)
    } else {
        debug!(%branch, "current branch");
        Ok(Some(branch))
    }
}

/// URL of a named remote, or `None` if it is not configured.
#[instrument]
pub fn remote_url(root: &Utf8Path, remote: &str) -> GitResult<Option<String>> {
    match git(root, &["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse owner and repo from a git remote URL.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
/// - `ssh://git@github.com/owner/repo.git`
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = if let Some((_, after_scheme)) = url.split_once("://") {
        after_scheme.split_once('/').map(|(_, path)| path)
    } else {
        url.split_once(':').map(|(_, path)| path)
    }?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn git(root: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root.as_std_path())
        .output()?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.contains("not a git repository") {
        return Err(GitError::NotARepo);
    }
    Err(GitError::Command {
        command: args.first().copied().unwrap_or_default().to_string(),
        stderr,
    })
}
