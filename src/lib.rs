//! kommit - A CLI tool that writes commit messages and pull request descriptions
//! from your pending changes using Gemini.
//!
//! # Overview
//!
//! kommit reads the staged (or, in auto-select mode, all pending) changes,
//! asks Gemini for a conventional commit message, lets you confirm, edit, or
//! regenerate it, and then commits, pushes, or opens a pull request.

pub mod change;
pub mod config;
pub mod error;
pub mod executor;
pub mod generate;
pub mod git;
pub mod github;
pub mod interaction;
pub mod logging;
pub mod options;
pub mod progress;
pub mod prompt;
pub mod ui;
pub mod workflow;

// Re-export commonly used types
pub use change::{ChangeSet, CommitChange};
pub use error::{
    ConfigError, ExecutionError, GenerationError, GitError, GitHubError, InteractionError,
    WorkflowError,
};
pub use interaction::UserAction;
pub use options::CommitOptions;
pub use workflow::{Outcome, Workflow};
