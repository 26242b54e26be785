//! GitHub token discovery.
//!
//! Lookup order:
//! 1. `gh auth token` (gh CLI)
//! 2. `GITHUB_TOKEN`
//! 3. `GH_TOKEN`

use std::env;
use std::process::Command;

use tracing::debug;

use crate::error::GitHubError;

const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Get a GitHub token, preferring the gh CLI session over the environment.
pub fn get_github_token() -> Result<String, GitHubError> {
    if let Some(token) = token_from_gh_cli() {
        return Ok(token);
    }
    token_from_env().ok_or(GitHubError::AuthenticationFailed)
}

/// First non-empty token among the supported environment variables.
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn token_from_gh_cli() -> Option<String> {
    which::which("gh").ok()?;

    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        debug!("gh auth token failed; falling back to environment");
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
