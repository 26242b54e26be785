//! Terminal actions for a confirmed message: commit, push, open a pull request.
//!
//! Exactly one commit is attempted per call and nothing is retried. A push
//! that fails after a successful commit leaves the commit in place and is
//! reported as [`CommitReport::CommittedNotPushed`].

use tracing::{debug, warn};

use crate::error::ExecutionError;
use crate::git::VersionControl;
use crate::github::{CreatedPullRequest, NewPullRequest, PullRequestHost, parse_github_remote};
use crate::options::CommitOptions;
use crate::ui::Reporter;

const DRY_RUN_BANNER: &str = "🔍 DRY RUN - No changes will be made";

/// Result of [`CommitExecutor::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReport {
    Committed,
    CommittedAndPushed,
    /// The commit landed but the push did not.
    CommittedNotPushed { error: String },
    DryRun,
}

impl CommitReport {
    pub fn is_partial(&self) -> bool {
        matches!(self, CommitReport::CommittedNotPushed { .. })
    }
}

/// Result of [`CommitExecutor::open_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestReport {
    Created(CreatedPullRequest),
    DryRun,
}

/// Where a pull request goes: the remote to push to and the branch to merge into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
    pub remote: String,
    pub base: String,
}

/// Split a confirmed message into a title (first line) and body (the rest).
pub fn split_title_body(message: &str) -> (String, String) {
    match message.split_once('\n') {
        Some((title, body)) => (title.trim().to_string(), body.trim().to_string()),
        None => (message.trim().to_string(), String::new()),
    }
}

pub struct CommitExecutor<'a, V: ?Sized> {
    vcs: &'a V,
    reporter: Reporter,
}

impl<'a, V: VersionControl + ?Sized> CommitExecutor<'a, V> {
    pub fn new(vcs: &'a V, reporter: Reporter) -> Self {
        Self { vcs, reporter }
    }

    /// Commit `message`, scoped to `scope` when non-empty, then push if asked.
    pub fn commit(
        &self,
        message: &str,
        scope: &[String],
        opts: &CommitOptions,
    ) -> Result<CommitReport, ExecutionError> {
        if opts.dry_run {
            self.reporter.warn(DRY_RUN_BANNER);
            self.reporter
                .info(format!("Would commit with message: {message}"));
            if opts.push {
                self.reporter
                    .info("Would push changes to remote repository");
            }
            return Ok(CommitReport::DryRun);
        }

        debug!(files = scope.len(), no_verify = opts.no_verify, "committing");
        self.vcs
            .commit(message, opts.no_verify, scope)
            .map_err(ExecutionError::CommitFailed)?;
        self.reporter.success("Successfully committed!");

        if !opts.push {
            return Ok(CommitReport::Committed);
        }

        match self.vcs.push() {
            Ok(()) => {
                self.reporter.success("Successfully pushed!");
                Ok(CommitReport::CommittedAndPushed)
            }
            Err(e) => {
                warn!(error = %e, "push failed after commit");
                self.reporter
                    .failure(format!("Committed, but failed to push: {e}"));
                Ok(CommitReport::CommittedNotPushed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Push the current branch and open a pull request described by `message`.
    pub async fn open_pull_request<H: PullRequestHost + ?Sized>(
        &self,
        message: &str,
        draft: bool,
        target: &PullRequestTarget,
        opts: &CommitOptions,
        host: &H,
    ) -> Result<PullRequestReport, ExecutionError> {
        let (title, body) = split_title_body(message);

        if opts.dry_run {
            self.reporter.warn(DRY_RUN_BANNER);
            self.reporter
                .info(format!("Would create a pull request with title: {title}"));
            return Ok(PullRequestReport::DryRun);
        }

        let url = self.vcs.remote_url(&target.remote)?;
        let (owner, repo) = parse_github_remote(&url)?;
        let branch = self.vcs.current_branch()?;

        self.vcs
            .push_branch(&target.remote, &branch)
            .map_err(|source| ExecutionError::PushBranchFailed {
                remote: target.remote.clone(),
                branch: branch.clone(),
                source,
            })?;

        let request = NewPullRequest {
            owner,
            repo,
            title,
            body,
            head: branch,
            base: target.base.clone(),
            draft,
        };
        let created = host.create_pull_request(&request).await?;

        self.reporter.success("Successfully created a pull request!");
        self.reporter.info(&created.html_url);
        Ok(PullRequestReport::Created(created))
    }
}
