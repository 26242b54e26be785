//! GitHub pull-request creation using octocrab.

pub mod auth;
pub mod pulls;

pub use auth::get_github_token;
pub use pulls::{
    CreatedPullRequest, GitHubHost, NewPullRequest, PullRequestHost, parse_github_remote,
};
