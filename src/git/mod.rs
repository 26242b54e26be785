//! Version-control operations.
//!
//! Reads go through git2; anything that mutates the repository or talks to a
//! remote shells out to the system `git` so hooks, credentials, and signing
//! config behave exactly as they do for the user.

pub mod issue;
pub mod status;
pub mod system;
pub mod untracked;

use std::path::PathBuf;

pub use issue::{DEFAULT_ISSUE_PATTERNS, IssuePatterns, detect_from_branch};
pub use status::{FileChange, FileStatus};
pub use system::SystemGit;

use crate::error::GitError;

/// The repository operations the commit and pull-request flows rely on.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Check that a usable `git` binary is on PATH.
    fn verify_installed(&self) -> Result<(), GitError>;

    /// Check that the working directory is inside a non-bare repository.
    fn verify_repository(&self) -> Result<(), GitError>;

    /// Root of the working tree.
    fn toplevel(&self) -> Result<PathBuf, GitError>;

    /// Stage every tracked and untracked modification.
    fn stage_all(&self) -> Result<(), GitError>;

    /// Staged file names and the staged diff.
    ///
    /// Fails with [`GitError::NothingToAnalyze`] when nothing is staged.
    fn staged_changes(&self) -> Result<(Vec<String>, String), GitError>;

    /// Every pending change in the working directory, untracked included.
    fn all_changes(&self) -> Result<Vec<FileChange>, GitError>;

    /// Staged and unstaged diffs plus synthesized diffs for untracked files.
    fn diff_including_untracked(&self) -> Result<String, GitError>;

    /// Create a commit. A non-empty `scope` commits exactly those paths.
    fn commit(&self, message: &str, no_verify: bool, scope: &[String]) -> Result<(), GitError>;

    /// Push the current branch to its upstream.
    fn push(&self) -> Result<(), GitError>;

    /// Push `branch` to `remote`, creating the upstream tracking reference.
    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    fn fetch(&self, remote: &str) -> Result<(), GitError>;

    /// Empty the stage area without touching the working tree.
    fn reset_staged(&self) -> Result<(), GitError>;

    fn stage_files(&self, files: &[String]) -> Result<(), GitError>;

    fn current_branch(&self) -> Result<String, GitError>;

    /// The remote to push to, preferring `origin`.
    fn remote_name(&self) -> Result<String, GitError>;

    fn remote_url(&self, remote: &str) -> Result<String, GitError>;

    /// Default branch of `remote` (e.g. `main`).
    fn default_branch(&self, remote: &str) -> Result<String, GitError>;

    /// Files and diff text for `base...HEAD`.
    fn diff_against(&self, base: &str) -> Result<(Vec<String>, String), GitError>;
}
