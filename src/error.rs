//! Error types for kommit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git is not installed or not on PATH")]
    NotInstalled,

    #[error("The current directory must be a git repository: {0}")]
    NotARepository(#[source] git2::Error),

    #[error("Bare repositories are not supported")]
    BareRepository,

    #[error("Failed to run git {operation}: {source}")]
    Spawn {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Repository error: {0}")]
    Repository(#[source] git2::Error),

    #[error("Nothing to analyze")]
    NothingToAnalyze,

    #[error("No git remotes configured")]
    NoRemotes,

    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    #[error("Could not determine the default branch of remote '{0}'")]
    DefaultBranchUnknown(String),
}

/// Errors from the text-generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to reach the generation service: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Generation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Generation service timed out after {0} seconds")]
    Timeout(u64),

    #[error("Generation service returned no candidate text")]
    EmptyResponse,

    #[error("Could not parse model output: {0}")]
    InvalidResponse(String),
}

/// Errors raised while talking to the user.
#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Interactive prompt failed: {0}")]
    Dialog(#[from] dialoguer::Error),

    #[error("no files selected")]
    NoFilesSelected,
}

/// Errors from GitHub API operations.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(
        "GitHub authentication failed: no valid auth found. Run 'gh auth login' or set GITHUB_TOKEN environment variable"
    )]
    AuthenticationFailed,

    #[error("Failed to parse repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("A pull request for {head} already exists")]
    PullRequestExists { head: String },

    #[error("Repository not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("Failed to create pull request: {0}")]
    CreatePullRequest(#[source] Box<octocrab::Error>),
}

/// Errors from loading, editing, and saving the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown config key '{0}'. Run 'kommit config list' to see available keys")]
    UnknownKey(String),

    #[error("Value '{value}' for {key} is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid issue pattern '{pattern}': {reason}")]
    InvalidIssuePattern { pattern: String, reason: String },
}

/// Errors from the terminal commit / push / pull-request actions.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to commit changes: {0}")]
    CommitFailed(#[source] GitError),

    #[error("Failed to push branch '{branch}' to '{remote}': {source}")]
    PushBranchFailed {
        remote: String,
        branch: String,
        #[source]
        source: GitError,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Errors surfaced by the end-to-end commit and pull-request flows.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Environment(GitError),

    #[error(
        "no staged changes found. stage your changes manually, or automatically stage all changes with the `--all` flag, or use the `--auto` flag to let AI select changes"
    )]
    NoStagedChanges,

    #[error("no changes found in working directory")]
    NoWorkingTreeChanges,

    #[error("no changes found between {base} and HEAD")]
    NothingToCompare { base: String },

    #[error("Failed to detect changes: {0}")]
    Detection(#[source] GitError),

    #[error("no commit messages were generated. try again")]
    NoMessageGenerated {
        #[source]
        source: Option<GenerationError>,
    },

    #[error("the model did not select any of the changed files")]
    NoFilesProposed,

    #[error("Failed to stage the selected files: {0}")]
    Restage(#[source] GitError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl WorkflowError {
    /// Empty-generation failure with no underlying cause.
    pub fn no_message() -> Self {
        WorkflowError::NoMessageGenerated { source: None }
    }
}

impl From<GenerationError> for WorkflowError {
    fn from(err: GenerationError) -> Self {
        WorkflowError::NoMessageGenerated { source: Some(err) }
    }
}
