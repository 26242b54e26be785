//! Issue identifier detection from branch names.

use regex_lite::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::git::VersionControl;

/// Patterns tried in order when no issue is given; the first match wins.
pub const DEFAULT_ISSUE_PATTERNS: &[&str] = &[
    r"(?i)([A-Z]+-\d+)",
    r"#(\d+)",
    r"(\d+)-",
    r"-(\d+)-",
    r"issue-(\d+)",
    r"fix-(\d+)",
    r"feat-(\d+)",
    r"bug-(\d+)",
];

#[derive(Debug, Clone)]
struct IssuePattern {
    regex: Regex,
    /// Case-insensitive patterns report their match upper-cased.
    uppercase: bool,
}

/// Ordered, compiled issue patterns.
#[derive(Debug, Clone)]
pub struct IssuePatterns {
    patterns: Vec<IssuePattern>,
}

impl IssuePatterns {
    /// Compile a pattern list. Each pattern needs one capture group.
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Result<Self, ConfigError> {
        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            let source = source.as_ref();
            let regex = Regex::new(source).map_err(|e| ConfigError::InvalidIssuePattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
            if regex.captures_len() < 2 {
                return Err(ConfigError::InvalidIssuePattern {
                    pattern: source.to_string(),
                    reason: "pattern needs a capture group for the identifier".to_string(),
                });
            }
            patterns.push(IssuePattern {
                regex,
                uppercase: source.starts_with("(?i)"),
            });
        }
        Ok(Self { patterns })
    }

    /// Find the first identifier any pattern extracts from `branch`.
    pub fn detect(&self, branch: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            let id = pattern.regex.captures(branch)?.get(1)?.as_str();
            Some(if pattern.uppercase {
                id.to_uppercase()
            } else {
                id.to_string()
            })
        })
    }
}

impl Default for IssuePatterns {
    fn default() -> Self {
        let patterns = DEFAULT_ISSUE_PATTERNS
            .iter()
            .filter_map(|source| {
                Some(IssuePattern {
                    regex: Regex::new(source).ok()?,
                    uppercase: source.starts_with("(?i)"),
                })
            })
            .collect();
        Self { patterns }
    }
}

/// Derive an issue identifier from the current branch.
///
/// Never fails: a detached HEAD or a branch with no identifier gives `None`.
pub fn detect_from_branch<V: VersionControl + ?Sized>(
    vcs: &V,
    patterns: &IssuePatterns,
) -> Option<String> {
    match vcs.current_branch() {
        Ok(branch) => {
            let issue = patterns.detect(&branch);
            debug!("Issue detection on branch {branch}: {issue:?}");
            issue
        }
        Err(e) => {
            debug!("Skipping issue detection: {e}");
            None
        }
    }
}
