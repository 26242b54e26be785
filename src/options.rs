//! The options bag threaded through a run.
//!
//! Built once at startup from CLI flags merged with settings: an explicitly
//! set flag wins, then the settings value, then the built-in default.

use crate::config::{ConfigKey, Settings};
use crate::error::ConfigError;
use crate::generate::DEFAULT_MODEL;
use crate::git::IssuePatterns;

pub const DEFAULT_MAX_LENGTH: usize = 72;
pub const DEFAULT_LANGUAGE: &str = "english";

/// Resolved options for one commit or pull-request run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    pub stage_all: bool,
    pub auto_select: bool,
    /// Split the change set into several commits.
    pub atomic: bool,
    pub no_confirm: bool,
    pub quiet: bool,
    pub push: bool,
    pub dry_run: bool,
    pub show_diff: bool,
    pub no_verify: bool,
    pub user_context: String,
    pub model: String,
    pub max_length: usize,
    pub language: String,
    /// Explicit issue identifier; detected from the branch when `None`.
    pub issue: Option<String>,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            stage_all: false,
            auto_select: false,
            atomic: false,
            no_confirm: false,
            quiet: false,
            push: false,
            dry_run: false,
            show_diff: false,
            no_verify: false,
            user_context: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            language: DEFAULT_LANGUAGE.to_string(),
            issue: None,
        }
    }
}

impl CommitOptions {
    /// Quiet only applies to headless runs; a run that asks questions is never quiet.
    pub fn normalized(mut self) -> Self {
        if self.quiet && !self.no_confirm {
            self.quiet = false;
        }
        self
    }
}

/// Values given on the command line. `None` means the flag was not set.
#[derive(Debug, Clone, Default)]
pub struct CommitFlags {
    pub stage_all: Option<bool>,
    pub auto_select: Option<bool>,
    pub atomic: bool,
    pub no_confirm: Option<bool>,
    pub quiet: Option<bool>,
    pub push: Option<bool>,
    pub dry_run: Option<bool>,
    pub show_diff: Option<bool>,
    pub no_verify: Option<bool>,
    pub user_context: Option<String>,
    pub model: Option<String>,
    pub max_length: Option<usize>,
    pub language: Option<String>,
    pub issue: Option<String>,
}

impl CommitFlags {
    /// Merge with settings and defaults, then normalize.
    pub fn resolve(&self, settings: &Settings) -> Result<CommitOptions, ConfigError> {
        let defaults = CommitOptions::default();
        let flag = |value: Option<bool>, key: ConfigKey| -> Result<bool, ConfigError> {
            match value {
                Some(v) => Ok(v),
                None => Ok(settings.boolean(key)?.unwrap_or(false)),
            }
        };

        let model = match &self.model {
            Some(m) => m.clone(),
            None => settings.string(ConfigKey::ApiModel)?.unwrap_or(defaults.model),
        };
        let max_length = match self.max_length {
            Some(n) => n,
            None => settings
                .integer(ConfigKey::CommitMaxLength)?
                .unwrap_or(defaults.max_length),
        };
        let language = match &self.language {
            Some(l) => l.clone(),
            None => settings
                .string(ConfigKey::CommitLanguage)?
                .unwrap_or(defaults.language),
        };

        let options = CommitOptions {
            stage_all: flag(self.stage_all, ConfigKey::StageAll)?,
            auto_select: flag(self.auto_select, ConfigKey::AutoSelect)?,
            atomic: self.atomic,
            no_confirm: flag(self.no_confirm, ConfigKey::NoConfirm)?,
            quiet: flag(self.quiet, ConfigKey::Quiet)?,
            push: flag(self.push, ConfigKey::Push)?,
            dry_run: flag(self.dry_run, ConfigKey::DryRun)?,
            show_diff: flag(self.show_diff, ConfigKey::ShowDiff)?,
            no_verify: flag(self.no_verify, ConfigKey::NoVerify)?,
            user_context: self.user_context.clone().unwrap_or_default(),
            model,
            max_length,
            language,
            issue: self.issue.clone().filter(|i| !i.trim().is_empty()),
        };

        Ok(options.normalized())
    }
}

/// Issue patterns from settings, or the defaults when unset.
pub fn resolve_issue_patterns(settings: &Settings) -> Result<IssuePatterns, ConfigError> {
    match settings.list(ConfigKey::CommitIssuePatterns)? {
        Some(patterns) if !patterns.is_empty() => IssuePatterns::new(&patterns),
        _ => Ok(IssuePatterns::default()),
    }
}
