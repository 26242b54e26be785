//! Pull-request creation via octocrab.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GitHubError;

/// Everything needed to open one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    #[serde(skip)]
    pub owner: String,
    #[serde(skip)]
    pub repo: String,
    pub title: String,
    pub body: String,
    /// Branch holding the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub draft: bool,
}

/// The subset of GitHub's response kommit reports back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub html_url: String,
}

/// A service that can open pull requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<CreatedPullRequest, GitHubError>;
}

/// [`PullRequestHost`] backed by the GitHub REST API.
pub struct GitHubHost {
    octocrab: Octocrab,
}

impl GitHubHost {
    /// Build a client authenticated with `token`.
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| GitHubError::CreatePullRequest(Box::new(e)))?;
        Ok(Self { octocrab })
    }

    /// An unauthenticated client. Creating pull requests with it fails.
    pub fn anonymous() -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder()
            .build()
            .map_err(|e| GitHubError::CreatePullRequest(Box::new(e)))?;
        Ok(Self { octocrab })
    }

    /// Use a pre-configured octocrab client (e.g. one pointed at a mock server).
    pub fn with_client(octocrab: Octocrab) -> Self {
        Self { octocrab }
    }
}

#[async_trait]
impl PullRequestHost for GitHubHost {
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<CreatedPullRequest, GitHubError> {
        let route = format!("/repos/{}/{}/pulls", request.owner, request.repo);
        debug!(route = %route, head = %request.head, base = %request.base, "creating pull request");

        let result: Result<CreatedPullRequest, octocrab::Error> =
            self.octocrab.post(route, Some(request)).await;

        result.map_err(|e| {
            // octocrab's error formats differ by variant; inspect both renderings.
            let display = e.to_string().to_lowercase();
            let debug = format!("{e:?}").to_lowercase();

            if display.contains("already exists") || debug.contains("already exists") {
                return GitHubError::PullRequestExists {
                    head: request.head.clone(),
                };
            }
            if display.contains("not found") || debug.contains("not found") {
                return GitHubError::RepositoryNotFound {
                    owner: request.owner.clone(),
                    repo: request.repo.clone(),
                };
            }
            GitHubError::CreatePullRequest(Box::new(e))
        })
    }
}

/// Extract owner and repo from a GitHub remote URL (SSH or HTTPS).
pub fn parse_github_remote(url: &str) -> Result<(String, String), GitHubError> {
    let invalid = || GitHubError::InvalidRepositoryUrl(url.to_string());

    let path = if let Some(path) = url.strip_prefix("git@github.com:") {
        path
    } else if let Some((_, path)) = url.split_once("github.com/") {
        path
    } else {
        return Err(invalid());
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo, ..] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssh_url() {
        let (owner, repo) = parse_github_remote("git@github.com:owner/repo.git").unwrap();
        assert_eq!(owner, "owner");
        assert_eq!(repo, "repo");
    }

    #[test]
    fn test_parse_https_url() {
        let (owner, repo) = parse_github_remote("https://github.com/owner/repo.git").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("owner", "repo"));

        let (owner, repo) = parse_github_remote("https://github.com/owner/repo/").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("owner", "repo"));
    }

    #[test]
    fn test_parse_ssh_scheme_url() {
        let (owner, repo) = parse_github_remote("ssh://git@github.com/owner/repo.git").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("owner", "repo"));
    }

    #[test]
    fn test_parse_invalid_url() {
        let err = parse_github_remote("https://gitlab.com/owner/repo").unwrap_err();
        assert!(matches!(err, GitHubError::InvalidRepositoryUrl(ref u) if u.contains("gitlab")));
        assert!(parse_github_remote("git@github.com:owner").is_err());
    }

    #[test]
    fn test_request_body_omits_routing_fields() {
        let request = NewPullRequest {
            owner: "o".to_string(),
            repo: "r".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            head: "feature".to_string(),
            base: "main".to_string(),
            draft: true,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "t", "body": "b", "head": "feature", "base": "main", "draft": true})
        );
    }
}
