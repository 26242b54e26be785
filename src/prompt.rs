//! Prompt construction for generated commit messages and pull requests.

use std::fmt::Write as _;

use crate::change::ChangeSet;

/// Maximum characters of diff text sent to the model.
const MAX_DIFF_LENGTH: usize = 100_000;

pub const COMMIT_SYSTEM_INSTRUCTION: &str = "You are a commit message generator that follows these rules:
1. Write in present tense
2. Be concise and direct
3. Output only the commit message without any explanations
4. Follow the format: <type>(<optional scope>): <commit message>";

pub const PULL_REQUEST_SYSTEM_INSTRUCTION: &str = "You write pull request descriptions that follow these rules:
1. The first line is the pull request title in the format <type>(<optional scope>): <summary>
2. Everything after the first line is a markdown body explaining what changed and why
3. Output only the title and body without any explanations or code fences";

/// Conventional commit types offered to the model.
const COMMIT_TYPES: &[(&str, &str)] = &[
    ("feat", "A new feature"),
    ("fix", "A bug fix"),
    ("docs", "Documentation only changes"),
    ("style", "Changes that do not affect the meaning of the code (formatting, whitespace)"),
    ("refactor", "A code change that neither fixes a bug nor adds a feature"),
    ("perf", "A code change that improves performance"),
    ("test", "Adding missing tests or correcting existing tests"),
    ("build", "Changes that affect the build system or external dependencies"),
    ("ci", "Changes to CI configuration files and scripts"),
    ("chore", "Other changes that don't modify src or test files"),
    ("revert", "Reverts a previous commit"),
];

/// Formatting constraints and free-text context for one prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub max_length: usize,
    pub language: &'a str,
    pub user_context: &'a str,
}

/// Prompt for a single commit message over the whole change set.
pub fn build_commit_prompt(changes: &ChangeSet, ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::from(
        "Generate a concise git commit message written in present tense for the code diff below.\n\n\
         The response must be in the format:\n<type>(<optional scope>): <commit message>\n\n\
         The commit message starts with a lowercase letter. Your entire response will be passed \
         directly into git commit.\n\n",
    );
    push_constraints(&mut prompt, changes, ctx);
    push_commit_types(&mut prompt);
    push_files(&mut prompt, changes);
    push_diff(&mut prompt, &changes.diff);
    prompt
}

/// Prompt for the combined call that picks files and writes their message.
pub fn build_file_selection_prompt(changes: &ChangeSet, ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::from(
        "The working directory contains the changes below. Choose the files that belong \
         together in one logical commit and write the commit message for exactly those files.\n\n\
         Respond in exactly this layout and nothing else:\n\
         FILES:\n<one changed file path per line>\n\
         COMMIT_MESSAGE:\n<type>(<optional scope>): <commit message>\n\n\
         Only list paths from the changed files list.\n\n",
    );
    push_constraints(&mut prompt, changes, ctx);
    push_commit_types(&mut prompt);
    push_files(&mut prompt, changes);
    push_diff(&mut prompt, &changes.diff);
    prompt
}

/// Prompt asking for the change set split into independent commits.
pub fn build_atomic_prompt(changes: &ChangeSet, ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::from(
        "Split the changes below into the smallest set of independent, logically separate \
         commits. Every changed file belongs to exactly one commit.\n\n\
         Respond with only a JSON array, in the order the commits should be made:\n\
         [{\"commitMessage\": \"<type>(<optional scope>): <commit message>\", \
         \"reason\": \"<why these files belong together>\", \
         \"fileIdentifiers\": [\"<changed file path>\"]}]\n\n",
    );
    push_constraints(&mut prompt, changes, ctx);
    push_commit_types(&mut prompt);
    push_files(&mut prompt, changes);
    push_diff(&mut prompt, &changes.diff);
    prompt
}

/// Prompt for a pull request title and body describing a branch.
pub fn build_pull_request_prompt(changes: &ChangeSet, ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::from(
        "Write a pull request for the branch diff below. The first line is the title; \
         the rest is a markdown body summarising the changes and their motivation.\n\n",
    );
    push_constraints(&mut prompt, changes, ctx);
    push_files(&mut prompt, changes);
    push_diff(&mut prompt, &changes.diff);
    prompt
}

fn push_constraints(prompt: &mut String, changes: &ChangeSet, ctx: &PromptContext<'_>) {
    let _ = writeln!(prompt, "## Constraints");
    let _ = writeln!(
        prompt,
        "Maximum commit message length: {} characters",
        ctx.max_length
    );
    let _ = writeln!(prompt, "Language: {}", ctx.language);
    if let Some(issue) = changes.issue.as_deref().filter(|i| !i.is_empty()) {
        let _ = writeln!(prompt, "Issue reference: {issue}");
    }
    if !ctx.user_context.trim().is_empty() {
        let _ = writeln!(
            prompt,
            "\n## Context\nUse the following context to understand intent:\n{}",
            ctx.user_context.trim()
        );
    }
    prompt.push('\n');
}

fn push_commit_types(prompt: &mut String) {
    let _ = writeln!(prompt, "## Commit types");
    for (name, description) in COMMIT_TYPES {
        let _ = writeln!(prompt, "- {name}: {description}");
    }
    prompt.push('\n');
}

fn push_files(prompt: &mut String, changes: &ChangeSet) {
    let _ = writeln!(prompt, "## Changed files");
    for file in &changes.files {
        let _ = writeln!(prompt, "- {file}");
    }
    prompt.push('\n');

    if !changes.related_files.is_empty() {
        let _ = writeln!(prompt, "## Neighboring files");
        for (dir, listing) in &changes.related_files {
            let _ = writeln!(prompt, "{dir}: {listing}");
        }
        prompt.push('\n');
    }
}

fn push_diff(prompt: &mut String, diff: &str) {
    let (sanitized, truncated) = sanitize_diff(diff, MAX_DIFF_LENGTH);
    let _ = write!(prompt, "## Code diff\n```diff\n{sanitized}");
    if !sanitized.ends_with('\n') {
        prompt.push('\n');
    }
    if truncated {
        prompt.push_str("[diff truncated]\n");
    }
    prompt.push_str("```\n");
}

/// Sanitize diff text for inclusion in a prompt.
///
/// Drops control characters (keeping line endings and tabs) and ANSI escape
/// sequences, then truncates at a char boundary. The flag is set only when
/// the text was cut.
pub fn sanitize_diff(text: &str, max_len: usize) -> (String, bool) {
    let mut result = remove_ansi_escapes(text);
    result.retain(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'));

    if result.len() <= max_len {
        return (result, false);
    }

    let mut end = max_len;
    while end > 0 && !result.is_char_boundary(end) {
        end -= 1;
    }
    result.truncate(end);
    (result, true)
}

fn remove_ansi_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequences end with a byte in '@'..='~'.
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_LINE_DIFF: &str = "diff --git a/src/main.go b/src/main.go\n--- a/src/main.go\n+++ b/src/main.go\n@@ -1,0 +1,5 @@\n+package main\n+\n+func main() {\n+\tprintln(\"hi\")\n+}\n";

    fn ctx() -> PromptContext<'static> {
        PromptContext {
            max_length: 72,
            language: "english",
            user_context: "",
        }
    }

    fn staged_main() -> ChangeSet {
        ChangeSet::new(vec!["src/main.go".to_string()], FIVE_LINE_DIFF.to_string())
    }

    #[test]
    fn test_commit_prompt_includes_diff_and_constraints() {
        let prompt = build_commit_prompt(&staged_main(), &ctx());

        assert!(prompt.contains(FIVE_LINE_DIFF));
        assert!(prompt.contains("Maximum commit message length: 72 characters"));
        assert!(prompt.contains("Language: english"));
        assert!(prompt.contains("- src/main.go"));
        assert!(!prompt.contains("Issue reference"));
    }

    #[test]
    fn test_commit_prompt_includes_issue_and_context() {
        let mut changes = staged_main();
        changes.issue = Some("ISSUE-482".to_string());
        let context = PromptContext {
            user_context: "login form was broken on mobile",
            ..ctx()
        };

        let prompt = build_commit_prompt(&changes, &context);
        assert!(prompt.contains("Issue reference: ISSUE-482"));
        assert!(prompt.contains("login form was broken on mobile"));
    }

    #[test]
    fn test_commit_prompt_lists_neighboring_files() {
        let mut changes = staged_main();
        changes
            .related_files
            .insert("src".to_string(), "lib.go, main.go".to_string());

        let prompt = build_commit_prompt(&changes, &ctx());
        assert!(prompt.contains("## Neighboring files\nsrc: lib.go, main.go"));
    }

    #[test]
    fn test_file_selection_prompt_names_markers() {
        let prompt = build_file_selection_prompt(&staged_main(), &ctx());
        assert!(prompt.contains("FILES:"));
        assert!(prompt.contains("COMMIT_MESSAGE:"));
    }

    #[test]
    fn test_atomic_prompt_names_json_fields() {
        let prompt = build_atomic_prompt(&staged_main(), &ctx());
        assert!(prompt.contains("\"commitMessage\""));
        assert!(prompt.contains("\"fileIdentifiers\""));
    }

    #[test]
    fn test_pull_request_prompt_has_no_commit_types() {
        let prompt = build_pull_request_prompt(&staged_main(), &ctx());
        assert!(prompt.contains("pull request"));
        assert!(!prompt.contains("## Commit types"));
        assert!(prompt.contains(FIVE_LINE_DIFF));
    }

    #[test]
    fn test_sanitize_diff_removes_ansi() {
        let text = "\x1b[31m-old line\x1b[0m\n\x1b[32m+new line\x1b[0m\n";
        let (sanitized, truncated) = sanitize_diff(text, 1000);
        assert_eq!(sanitized, "-old line\n+new line\n");
        assert!(!truncated);
    }

    #[test]
    fn test_sanitize_diff_keeps_line_endings_drops_controls() {
        let (sanitized, truncated) = sanitize_diff("+\tindented\x07\r\n", 1000);
        assert_eq!(sanitized, "+\tindented\r\n");
        assert!(!truncated);
    }

    #[test]
    fn test_sanitize_diff_truncates_at_char_boundary() {
        let text = "é".repeat(10);
        let (sanitized, truncated) = sanitize_diff(&text, 5);
        assert_eq!(sanitized, "éé");
        assert!(truncated);
    }

    #[test]
    fn test_truncated_diff_is_flagged() {
        let big = "+x\n".repeat(MAX_DIFF_LENGTH);
        let changes = ChangeSet::new(vec!["big.txt".to_string()], big);
        let prompt = build_commit_prompt(&changes, &ctx());
        assert!(prompt.contains("[diff truncated]"));
    }

    #[test]
    fn test_crlf_diff_is_kept_verbatim() {
        let diff = "diff --git a/run.bat b/run.bat\n--- a/run.bat\n+++ b/run.bat\n@@ -1 +1 @@\n-echo bye\r\n+echo hi\r\n";
        let changes = ChangeSet::new(vec!["run.bat".to_string()], diff.to_string());
        let prompt = build_commit_prompt(&changes, &ctx());
        assert!(prompt.contains(diff));
        assert!(!prompt.contains("[diff truncated]"));
    }

    #[test]
    fn test_stripped_control_bytes_are_not_truncation() {
        let diff = "+bell\x07\n";
        let changes = ChangeSet::new(vec!["bell.txt".to_string()], diff.to_string());
        let prompt = build_commit_prompt(&changes, &ctx());
        assert!(prompt.contains("+bell\n"));
        assert!(!prompt.contains("[diff truncated]"));
    }
}
