//! Git operations for release analysis.
//!
//! Shells out to `git` for all operations, in the current working directory.
//! This ensures we inherit the user's configuration, alternates and partial
//! clone settings.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::changelog::LOG_FORMAT;
use crate::release::{ReleaseBoundary, TagScheme};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Source of release tags and change logs.
pub trait History {
    /// Release tag names for `scheme`, in the order the backend lists them.
    fn release_tags(&self, scheme: &TagScheme) -> GitResult<Vec<String>>;

    /// Raw `--numstat` log text for `boundary`.
    ///
    /// When the boundary has no start, the log covers the `fallback_months`
    /// months leading up to the end tag.
    fn change_log(&self, boundary: &ReleaseBoundary, fallback_months: u32) -> GitResult<String>;
}

/// [`History`] backed by the `git` CLI in the working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHistory;

impl History for GitHistory {
    fn release_tags(&self, scheme: &TagScheme) -> GitResult<Vec<String>> {
        release_tags(scheme)
    }

    fn change_log(&self, boundary: &ReleaseBoundary, fallback_months: u32) -> GitResult<String> {
        change_log(boundary, fallback_months)
    }
}

/// List tags matching the scheme's release glob.
#[instrument]
pub fn release_tags(scheme: &TagScheme) -> GitResult<Vec<String>> {
    let output = git(&["tag", "-l", &scheme.tag_glob()])?;
    let tags: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!(count = tags.len(), "release tags");
    Ok(tags)
}

/// Read the change log for a boundary.
#[instrument]
pub fn change_log(boundary: &ReleaseBoundary, fallback_months: u32) -> GitResult<String> {
    let args = log_args(boundary, fallback_months);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = git(&args)?;
    debug!(bytes = output.len(), range = %boundary, "read change log");
    Ok(output)
}

/// Build the `git log` arguments for a boundary.
pub fn log_args(boundary: &ReleaseBoundary, fallback_months: u32) -> Vec<String> {
    let mut args = vec!["log".to_string(), boundary.revision_range()];
    if boundary.start.is_none() {
        args.push(format!("--since={fallback_months} months ago"));
    }
    args.extend([
        LOG_FORMAT.to_string(),
        "--date=iso".to_string(),
        "--numstat".to_string(),
    ]);
    args
}

/// Get the remote URL for a named remote (default: `"origin"`).
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    let result = git(&["remote", "get-url", remote]);
    match result {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    let result = git(&["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Detect "not a git repo" specifically
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
