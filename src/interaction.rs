//! Review dialogs: the action menu shown for every generated message and the
//! file confirmation shown in auto-select mode.
//!
//! Message review state machine:
//!
//! | Choice       | Result                                            |
//! |--------------|---------------------------------------------------|
//! | Yes          | [`Review::Confirmed`] with the message unchanged  |
//! | Edit         | [`Review::Confirmed`] with the edited text        |
//! | Regenerate   | [`Review::Regenerate`]                            |
//! | Edit Context | context rewritten, then [`Review::ContextEdited`] |
//! | Cancel       | [`Review::Cancelled`], notice printed             |

use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Editor, MultiSelect, Select};

use crate::error::InteractionError;
use crate::options::CommitOptions;
use crate::ui::Reporter;

/// Longest text accepted from the editor.
pub const EDIT_CHAR_LIMIT: usize = 1000;

/// A choice made in one of the dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Confirm,
    Regenerate,
    Edit,
    EditContext,
    Cancel,
    /// The user narrowed the proposed files (file dialog only).
    AutoSelect,
}

/// What is being reviewed; picks the dialog wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Commit,
    PullRequest,
}

impl Subject {
    fn menu_title(self) -> &'static str {
        match self {
            Subject::Commit => "Use this commit?",
            Subject::PullRequest => "Use this pull request?",
        }
    }

    fn edit_title(self) -> &'static str {
        match self {
            Subject::Commit => "Edit commit message manually",
            Subject::PullRequest => "Edit pull request manually",
        }
    }

    pub fn cancel_notice(self) -> &'static str {
        match self {
            Subject::Commit => "Commit cancelled",
            Subject::PullRequest => "Pull request cancelled",
        }
    }
}

/// Terminal dialogs used by [`InteractionController`].
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Review menu: Confirm, Regenerate, Edit, EditContext or Cancel.
    fn review_menu(&self, title: &str) -> Result<UserAction, InteractionError>;

    /// Free-text editor seeded with `initial`.
    fn edit_text(&self, title: &str, initial: &str) -> Result<String, InteractionError>;

    /// File confirmation: Confirm, Edit or Cancel.
    fn file_menu(&self, files: &[String]) -> Result<UserAction, InteractionError>;

    /// Multi-select over `candidates`, all preselected.
    fn pick_files(&self, candidates: &[String]) -> Result<Vec<String>, InteractionError>;
}

/// [`Prompter`] on dialoguer. Headings and menus share stdout with the
/// rest of the user-facing output.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
    term: Term,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    fn heading(&self, text: &str) -> Result<(), InteractionError> {
        self.term
            .write_line(&style(text).bold().to_string())
            .map_err(dialoguer::Error::from)?;
        Ok(())
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            term: Term::stdout(),
        }
    }
}

const REVIEW_CHOICES: [(&str, UserAction); 5] = [
    ("Yes", UserAction::Confirm),
    ("Regenerate", UserAction::Regenerate),
    ("Edit", UserAction::Edit),
    ("Edit Context", UserAction::EditContext),
    ("Cancel", UserAction::Cancel),
];

const FILE_CHOICES: [(&str, UserAction); 3] = [
    ("Yes", UserAction::Confirm),
    ("Edit", UserAction::Edit),
    ("Cancel", UserAction::Cancel),
];

fn choose(
    theme: &ColorfulTheme,
    term: &Term,
    title: &str,
    choices: &[(&str, UserAction)],
) -> Result<UserAction, InteractionError> {
    let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
    let idx = Select::with_theme(theme)
        .with_prompt(title)
        .items(&labels)
        .default(0)
        .interact_on(term)?;
    Ok(choices.get(idx).map_or(UserAction::Cancel, |(_, action)| *action))
}

impl Prompter for DialoguerPrompter {
    fn review_menu(&self, title: &str) -> Result<UserAction, InteractionError> {
        choose(&self.theme, &self.term, title, &REVIEW_CHOICES)
    }

    fn edit_text(&self, title: &str, initial: &str) -> Result<String, InteractionError> {
        self.heading(title)?;
        let edited = Editor::new()
            .edit(initial)
            .map_err(dialoguer::Error::from)?;
        // Closing the editor without saving keeps the seed text.
        Ok(edited.unwrap_or_else(|| initial.to_string()))
    }

    fn file_menu(&self, files: &[String]) -> Result<UserAction, InteractionError> {
        self.heading("AI Selected Files")?;
        for file in files {
            self.term
                .write_line(&format!("- {file}"))
                .map_err(dialoguer::Error::from)?;
        }
        choose(&self.theme, &self.term, "Proceed with these files?", &FILE_CHOICES)
    }

    fn pick_files(&self, candidates: &[String]) -> Result<Vec<String>, InteractionError> {
        let defaults = vec![true; candidates.len()];
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt("Select files to include in commit")
            .items(candidates)
            .defaults(&defaults)
            .interact_on(&self.term)?;
        Ok(picked
            .into_iter()
            .filter_map(|idx| candidates.get(idx).cloned())
            .collect())
    }
}

/// Outcome of reviewing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    Confirmed(String),
    Regenerate,
    /// The user context changed; the message must be regenerated with it.
    ContextEdited,
    Cancelled,
}

/// Outcome of the auto-select file confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDecision {
    /// `Confirm` keeps the proposal, `AutoSelect` carries the user's subset,
    /// `Cancel` aborts the run.
    pub action: UserAction,
    pub files: Vec<String>,
}

/// Drives the review dialogs for the orchestrator.
pub struct InteractionController<P> {
    prompter: P,
    reporter: Reporter,
}

fn cap_chars(text: String) -> String {
    match text.char_indices().nth(EDIT_CHAR_LIMIT) {
        Some((end, _)) => text[..end].to_string(),
        None => text,
    }
}

impl<P: Prompter> InteractionController<P> {
    pub fn new(prompter: P, reporter: Reporter) -> Self {
        Self { prompter, reporter }
    }

    /// Present `message` and resolve the user's choice.
    ///
    /// With `no_confirm` nothing is shown and the message is confirmed as is.
    /// `EditContext` rewrites `user_context` in place.
    pub fn review(
        &self,
        message: &str,
        subject: Subject,
        opts: &CommitOptions,
        user_context: &mut String,
    ) -> Result<Review, InteractionError> {
        if opts.no_confirm {
            return Ok(Review::Confirmed(message.to_string()));
        }

        self.reporter.message(message);
        match self.prompter.review_menu(subject.menu_title())? {
            UserAction::Confirm => Ok(Review::Confirmed(message.to_string())),
            UserAction::Edit => {
                let edited = self.prompter.edit_text(subject.edit_title(), message)?;
                Ok(Review::Confirmed(cap_chars(edited).trim().to_string()))
            }
            UserAction::Regenerate => Ok(Review::Regenerate),
            UserAction::EditContext => {
                let edited = self.prompter.edit_text("Edit user context", user_context)?;
                *user_context = cap_chars(edited).trim().to_string();
                Ok(Review::ContextEdited)
            }
            UserAction::Cancel | UserAction::AutoSelect => {
                self.reporter.cancelled(subject.cancel_notice());
                Ok(Review::Cancelled)
            }
        }
    }

    /// Confirm, narrow, or reject the files proposed in auto-select mode.
    pub fn confirm_files(
        &self,
        proposed: &[String],
        opts: &CommitOptions,
    ) -> Result<FileDecision, InteractionError> {
        if opts.no_confirm {
            return Ok(FileDecision {
                action: UserAction::Confirm,
                files: proposed.to_vec(),
            });
        }

        match self.prompter.file_menu(proposed)? {
            UserAction::Edit => {
                let picked = self.prompter.pick_files(proposed)?;
                // Only proposed files can be kept.
                let picked: Vec<String> = picked
                    .into_iter()
                    .filter(|f| proposed.contains(f))
                    .collect();
                if picked.is_empty() {
                    return Err(InteractionError::NoFilesSelected);
                }
                Ok(FileDecision {
                    action: UserAction::AutoSelect,
                    files: picked,
                })
            }
            UserAction::Cancel => Ok(FileDecision {
                action: UserAction::Cancel,
                files: Vec::new(),
            }),
            _ => Ok(FileDecision {
                action: UserAction::Confirm,
                files: proposed.to_vec(),
            }),
        }
    }
}
