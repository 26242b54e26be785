//! End-to-end commit and pull-request flows.
//!
//! A run detects the change set once, then loops over generate → review
//! until the user confirms or cancels. Regeneration never re-reads the
//! repository.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::change::{ChangeSet, related_files};
use crate::error::{GitError, WorkflowError};
use crate::executor::{CommitExecutor, CommitReport, PullRequestTarget};
use crate::generate::{
    GenerationRequest, Generator, generate_atomic_changes, generate_message,
    generate_with_file_selection,
};
use crate::git::{IssuePatterns, VersionControl, detect_from_branch};
use crate::github::PullRequestHost;
use crate::interaction::{InteractionController, Prompter, Review, Subject, UserAction};
use crate::options::CommitOptions;
use crate::progress::{run_with_spinner, with_spinner};
use crate::prompt::{
    COMMIT_SYSTEM_INSTRUCTION, PULL_REQUEST_SYSTEM_INSTRUCTION, PromptContext,
    build_atomic_prompt, build_commit_prompt, build_file_selection_prompt,
    build_pull_request_prompt,
};
use crate::ui::Reporter;

type PromptBuilder = fn(&ChangeSet, &PromptContext<'_>) -> String;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Committed, but a requested push failed.
    PartiallyCompleted,
    Cancelled,
}

fn outcome_of(report: &CommitReport) -> Outcome {
    if report.is_partial() {
        Outcome::PartiallyCompleted
    } else {
        Outcome::Completed
    }
}

/// Wires change detection, generation, review, and execution together.
pub struct Workflow<'a, V: ?Sized, G: ?Sized, P> {
    vcs: &'a V,
    generator: &'a G,
    interaction: InteractionController<P>,
    reporter: Reporter,
    opts: CommitOptions,
}

impl<'a, V, G, P> Workflow<'a, V, G, P>
where
    V: VersionControl + ?Sized,
    G: Generator + ?Sized,
    P: Prompter,
{
    pub fn new(vcs: &'a V, generator: &'a G, prompter: P, opts: CommitOptions) -> Self {
        let opts = opts.normalized();
        let reporter = Reporter::new(opts.quiet);
        Self {
            vcs,
            generator,
            interaction: InteractionController::new(prompter, reporter),
            reporter,
            opts,
        }
    }

    pub fn options(&self) -> &CommitOptions {
        &self.opts
    }

    /// Generate, review, and commit.
    pub async fn run_commit(&self, patterns: &IssuePatterns) -> Result<Outcome, WorkflowError> {
        self.verify()?;

        if self.opts.stage_all {
            run_with_spinner("Staging changes...", self.spinners(), || {
                self.vcs.stage_all()
            })
            .map_err(WorkflowError::Detection)?;
        }

        let mut changes = self.detect()?;
        let noun = if self.whole_tree() { "changed" } else { "staged" };
        self.reporter.files(noun, &changes.files);
        self.add_context(&mut changes, patterns)?;

        if self.opts.show_diff {
            self.reporter.diff(&changes.diff);
        }

        if self.opts.atomic {
            return self.run_atomic(&changes).await;
        }

        let mut user_context = self.opts.user_context.clone();
        let mut pending = None;
        if self.opts.auto_select {
            match self.adopt_selection(&mut changes, &user_context).await? {
                Some(message) => pending = Some(message),
                None => return Ok(Outcome::Cancelled),
            }
        }

        let confirmed = self
            .review_loop(
                &changes,
                pending,
                Subject::Commit,
                &mut user_context,
                build_commit_prompt,
                COMMIT_SYSTEM_INSTRUCTION,
            )
            .await?;

        match confirmed {
            Some(message) => {
                let report = CommitExecutor::new(self.vcs, self.reporter).commit(
                    &message,
                    &[],
                    &self.opts,
                )?;
                Ok(outcome_of(&report))
            }
            None => Ok(Outcome::Cancelled),
        }
    }

    /// Describe the current branch against the remote default branch and open
    /// a pull request for it.
    pub async fn run_pull_request<H: PullRequestHost + ?Sized>(
        &self,
        patterns: &IssuePatterns,
        draft: bool,
        host: &H,
    ) -> Result<Outcome, WorkflowError> {
        self.verify()?;

        let remote = self.vcs.remote_name().map_err(WorkflowError::Environment)?;
        let spin = self.spinners();
        run_with_spinner("Fetching remote...", spin, || self.vcs.fetch(&remote))
            .map_err(WorkflowError::Detection)?;
        let base = self
            .vcs
            .default_branch(&remote)
            .map_err(WorkflowError::Detection)?;

        let range_base = format!("{remote}/{base}");
        let (files, diff) = run_with_spinner("Detecting changes...", spin, || {
            self.vcs.diff_against(&range_base)
        })
        .map_err(WorkflowError::Detection)?;
        if files.is_empty() {
            return Err(WorkflowError::NothingToCompare { base: range_base });
        }

        let mut changes = ChangeSet::new(files, diff);
        self.reporter.files("changed", &changes.files);
        self.add_context(&mut changes, patterns)?;
        if self.opts.show_diff {
            self.reporter.diff(&changes.diff);
        }

        let mut user_context = self.opts.user_context.clone();
        let confirmed = self
            .review_loop(
                &changes,
                None,
                Subject::PullRequest,
                &mut user_context,
                build_pull_request_prompt,
                PULL_REQUEST_SYSTEM_INSTRUCTION,
            )
            .await?;

        let Some(message) = confirmed else {
            return Ok(Outcome::Cancelled);
        };
        let target = PullRequestTarget { remote, base };
        CommitExecutor::new(self.vcs, self.reporter)
            .open_pull_request(&message, draft, &target, &self.opts, host)
            .await?;
        Ok(Outcome::Completed)
    }

    fn spinners(&self) -> bool {
        !self.opts.quiet
    }

    /// Auto-select and atomic runs look at the whole working tree.
    fn whole_tree(&self) -> bool {
        self.opts.auto_select || self.opts.atomic
    }

    fn verify(&self) -> Result<(), WorkflowError> {
        self.vcs
            .verify_installed()
            .map_err(WorkflowError::Environment)?;
        self.vcs
            .verify_repository()
            .map_err(WorkflowError::Environment)
    }

    fn detect(&self) -> Result<ChangeSet, WorkflowError> {
        let whole_tree = self.whole_tree();
        let detect = || -> Result<ChangeSet, GitError> {
            if whole_tree {
                let changes = self.vcs.all_changes()?;
                if changes.is_empty() {
                    return Err(GitError::NothingToAnalyze);
                }
                let diff = self.vcs.diff_including_untracked()?;
                let mut set = ChangeSet::default();
                for change in changes {
                    if let Some(old) = change.old_path {
                        set.renamed_from.insert(change.path.clone(), old);
                    }
                    set.files.push(change.path);
                }
                set.diff = diff;
                Ok(set)
            } else {
                let (files, diff) = self.vcs.staged_changes()?;
                Ok(ChangeSet::new(files, diff))
            }
        };
        let detected = run_with_spinner("Detecting changes...", self.spinners(), detect);

        detected.map_err(|e| match e {
            GitError::NothingToAnalyze if whole_tree => WorkflowError::NoWorkingTreeChanges,
            GitError::NothingToAnalyze => WorkflowError::NoStagedChanges,
            e => WorkflowError::Detection(e),
        })
    }

    /// Fill in neighbouring files and the issue reference.
    fn add_context(
        &self,
        changes: &mut ChangeSet,
        patterns: &IssuePatterns,
    ) -> Result<(), WorkflowError> {
        let root = self.vcs.toplevel().map_err(WorkflowError::Detection)?;
        changes.related_files = related_files(&root, &changes.files);
        changes.issue = self
            .opts
            .issue
            .clone()
            .or_else(|| detect_from_branch(self.vcs, patterns));
        Ok(())
    }

    fn prompt_context<'c>(&'c self, user_context: &'c str) -> PromptContext<'c> {
        PromptContext {
            max_length: self.opts.max_length,
            language: &self.opts.language,
            user_context,
        }
    }

    async fn generate(
        &self,
        changes: &ChangeSet,
        user_context: &str,
        subject: Subject,
        build: PromptBuilder,
        system_instruction: &str,
    ) -> Result<String, WorkflowError> {
        let prompt = build(changes, &self.prompt_context(user_context));
        debug!(chars = prompt.len(), files = changes.files.len(), "prompt built");

        let request = GenerationRequest::new(prompt, system_instruction, &self.opts.model);
        let label = match subject {
            Subject::Commit => "Generating commit message...",
            Subject::PullRequest => "Generating pull request...",
        };
        let message = with_spinner(
            label,
            self.spinners(),
            generate_message(self.generator, &request),
        )
        .await?;

        if message.is_empty() {
            return Err(WorkflowError::no_message());
        }
        Ok(message)
    }

    /// Review until the user confirms (`Some`) or cancels (`None`).
    async fn review_loop(
        &self,
        changes: &ChangeSet,
        mut pending: Option<String>,
        subject: Subject,
        user_context: &mut String,
        build: PromptBuilder,
        system_instruction: &str,
    ) -> Result<Option<String>, WorkflowError> {
        loop {
            let message = match pending.take() {
                Some(message) => message,
                None => {
                    self.generate(changes, user_context.as_str(), subject, build, system_instruction)
                        .await?
                }
            };

            match self
                .interaction
                .review(&message, subject, &self.opts, user_context)?
            {
                Review::Confirmed(text) => return Ok(Some(text)),
                Review::Regenerate => debug!("regenerating"),
                Review::ContextEdited => debug!("regenerating with edited context"),
                Review::Cancelled => return Ok(None),
            }
        }
    }

    /// Ask the model which files belong together, let the user confirm, then
    /// make the stage area match the adopted files exactly.
    ///
    /// Returns the message generated alongside the selection, or `None` when
    /// the user cancels.
    async fn adopt_selection(
        &self,
        changes: &mut ChangeSet,
        user_context: &str,
    ) -> Result<Option<String>, WorkflowError> {
        let prompt = build_file_selection_prompt(changes, &self.prompt_context(user_context));
        let request = GenerationRequest::new(prompt, COMMIT_SYSTEM_INSTRUCTION, &self.opts.model);
        let selection = with_spinner(
            "Selecting files...",
            self.spinners(),
            generate_with_file_selection(self.generator, &request),
        )
        .await?;
        debug!(tier = ?selection.tier, files = selection.files.len(), "file selection parsed");

        let message = selection.message.trim().to_string();
        if message.is_empty() {
            return Err(WorkflowError::no_message());
        }

        let mut seen = HashSet::new();
        let mut proposed = Vec::new();
        for file in selection.files {
            if !changes.contains(&file) {
                warn!(file = %file, "model proposed a file that has no changes; ignoring it");
                continue;
            }
            if seen.insert(file.clone()) {
                proposed.push(file);
            }
        }
        if proposed.is_empty() {
            return Err(WorkflowError::NoFilesProposed);
        }

        let decision = self.interaction.confirm_files(&proposed, &self.opts)?;
        if decision.action == UserAction::Cancel {
            self.reporter.cancelled(Subject::Commit.cancel_notice());
            return Ok(None);
        }

        changes.narrow(&decision.files);
        self.reporter.files("selected", &changes.files);

        if !self.opts.dry_run {
            self.vcs.reset_staged().map_err(WorkflowError::Restage)?;
            self.vcs
                .stage_files(&changes.pathspecs())
                .map_err(WorkflowError::Restage)?;
        }
        Ok(Some(message))
    }

    /// Commit each proposed unit in order, each with its own review.
    async fn run_atomic(&self, changes: &ChangeSet) -> Result<Outcome, WorkflowError> {
        let mut user_context = self.opts.user_context.clone();
        let prompt = build_atomic_prompt(changes, &self.prompt_context(&user_context));
        let request = GenerationRequest::new(prompt, COMMIT_SYSTEM_INSTRUCTION, &self.opts.model);
        let units = with_spinner(
            "Splitting changes into commits...",
            self.spinners(),
            generate_atomic_changes(self.generator, &request),
        )
        .await?;

        let total = units.len();
        let executor = CommitExecutor::new(self.vcs, self.reporter);
        let mut committed = 0;
        let mut partial = false;

        for (idx, unit) in units.into_iter().enumerate() {
            let position = idx + 1;
            let skip_reason = if let Some(error) = &unit.error {
                Some(error.clone())
            } else if unit.file_identifiers.is_empty() {
                Some("no files listed".to_string())
            } else if let Some(outsider) =
                unit.file_identifiers.iter().find(|f| !changes.contains(f))
            {
                Some(format!("{outsider} has no changes"))
            } else if unit.commit_message.trim().is_empty() {
                Some("no commit message".to_string())
            } else {
                None
            };
            if let Some(reason) = skip_reason {
                warn!(unit = position, reason = %reason, "skipping atomic commit");
                self.reporter
                    .warn(format!("Skipping commit {position}/{total}: {reason}"));
                continue;
            }

            self.reporter.info(format!("Commit {position}/{total}"));
            if !unit.reason.trim().is_empty() {
                self.reporter.info(unit.reason.trim());
            }
            let unit_changes = changes.subset(&unit.file_identifiers);
            self.reporter.files("grouped", &unit_changes.files);

            let confirmed = self
                .review_loop(
                    &unit_changes,
                    Some(unit.commit_message.trim().to_string()),
                    Subject::Commit,
                    &mut user_context,
                    build_commit_prompt,
                    COMMIT_SYSTEM_INSTRUCTION,
                )
                .await?;

            let Some(message) = confirmed else {
                return Ok(Outcome::Cancelled);
            };
            let report = executor.commit(&message, &unit_changes.pathspecs(), &self.opts)?;
            partial |= report.is_partial();
            committed += 1;
        }

        if committed == 0 {
            return Err(WorkflowError::no_message());
        }
        Ok(if partial {
            Outcome::PartiallyCompleted
        } else {
            Outcome::Completed
        })
    }
}
