//! Parsers for structured model output.
//!
//! Model output does not reliably follow the requested layout, so the
//! file-selection parser falls back through three tiers:
//!
//! 1. **Exact markers**: a line starting with `FILES:` and a later line
//!    starting with `COMMIT_MESSAGE:`.
//! 2. **Loose markers**: the same markers anywhere in a line, any case,
//!    with markdown decoration such as `**FILES:**` or `### Commit message:`.
//! 3. **First colon**: lines before the first line containing a colon are
//!    file paths; the message starts at that line.

use tracing::{debug, warn};

use crate::change::CommitChange;
use crate::error::GenerationError;
use crate::generate::json::{array_elements, extract_json_array, top_level_objects};

const FILES_MARKER: &str = "FILES:";
const MESSAGE_MARKER: &str = "COMMIT_MESSAGE:";

/// Which fallback tier produced a [`FileSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    ExactMarkers,
    LooseMarkers,
    FirstColon,
}

/// Files proposed by the model together with their commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub files: Vec<String>,
    pub message: String,
    pub tier: ParseTier,
}

/// Parse a combined FILES / COMMIT_MESSAGE response.
pub fn parse_file_selection(response: &str) -> Result<FileSelection, GenerationError> {
    let lines: Vec<&str> = response
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect();

    let selection = exact_markers(&lines)
        .or_else(|| loose_markers(&lines))
        .or_else(|| first_colon(&lines))
        .ok_or_else(|| {
            GenerationError::InvalidResponse(
                "expected a FILES section followed by a COMMIT_MESSAGE section".to_string(),
            )
        })?;

    debug!(
        "Parsed file selection ({:?}): {} files",
        selection.tier,
        selection.files.len()
    );
    Ok(selection)
}

fn exact_markers(lines: &[&str]) -> Option<FileSelection> {
    let files_at = lines
        .iter()
        .position(|l| l.trim_start().starts_with(FILES_MARKER))?;
    let message_at = files_at
        + 1
        + lines[files_at + 1..]
            .iter()
            .position(|l| l.trim_start().starts_with(MESSAGE_MARKER))?;

    let files_rest = after_marker(lines[files_at].trim_start(), FILES_MARKER.len());
    let message_rest = after_marker(lines[message_at].trim_start(), MESSAGE_MARKER.len());

    Some(FileSelection {
        files: collect_files(files_rest, &lines[files_at + 1..message_at]),
        message: collect_message(message_rest, &lines[message_at + 1..]),
        tier: ParseTier::ExactMarkers,
    })
}

fn loose_markers(lines: &[&str]) -> Option<FileSelection> {
    let find = |line: &str, markers: &[&str]| -> Option<usize> {
        let lower = line.to_lowercase();
        markers
            .iter()
            .find_map(|m| lower.find(m).map(|at| at + m.len()))
    };
    let file_markers = ["files:"];
    let message_markers = ["commit_message:", "commit message:"];

    let (files_at, files_end) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| find(l, &file_markers).map(|end| (i, end)))?;
    let (message_at, message_end) = lines
        .iter()
        .enumerate()
        .skip(files_at + 1)
        .find_map(|(i, l)| find(l, &message_markers).map(|end| (i, end)))?;

    // Lowercasing can shift byte offsets for non-ASCII text; bail out rather than slice badly.
    let files_rest = lines[files_at].get(files_end..)?;
    let message_rest = lines[message_at].get(message_end..)?;

    Some(FileSelection {
        files: collect_files(files_rest, &lines[files_at + 1..message_at]),
        message: collect_message(message_rest, &lines[message_at + 1..]),
        tier: ParseTier::LooseMarkers,
    })
}

fn first_colon(lines: &[&str]) -> Option<FileSelection> {
    let content: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .collect();
    let colon_at = content.iter().position(|l| l.contains(':'))?;

    Some(FileSelection {
        files: collect_files("", &content[..colon_at]),
        message: collect_message("", &content[colon_at..]),
        tier: ParseTier::FirstColon,
    })
}

fn after_marker(line: &str, marker_len: usize) -> &str {
    line.get(marker_len..).unwrap_or("")
}

fn collect_files(inline: &str, following: &[&str]) -> Vec<String> {
    std::iter::once(inline)
        .chain(following.iter().copied())
        .flat_map(|line| line.split(','))
        .filter_map(clean_file_entry)
        .collect()
}

/// Strip list bullets, numbering, and markdown quoting from a path entry.
fn clean_file_entry(entry: &str) -> Option<String> {
    let mut entry = entry.trim();
    for bullet in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = entry.strip_prefix(bullet) {
            entry = rest.trim_start();
            break;
        }
    }
    if let Some((number, rest)) = entry.split_once(". ")
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
    {
        entry = rest.trim_start();
    }

    let entry = entry.trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '*' | ' '));
    if entry.is_empty() {
        None
    } else {
        Some(entry.to_string())
    }
}

fn collect_message(inline: &str, following: &[&str]) -> String {
    let inline = inline.trim().trim_matches('*').trim();
    let mut message = String::from(inline);
    for line in following {
        if !message.is_empty() {
            message.push('\n');
        }
        message.push_str(line);
    }
    message.trim().to_string()
}

/// Parse an atomic-commit response into its units.
///
/// Each unit is decoded on its own; a unit that fails to decode is kept with
/// its `error` set so the caller can report it in order.
pub fn parse_atomic_changes(response: &str) -> Result<Vec<CommitChange>, GenerationError> {
    let json = extract_json_array(response).ok_or_else(|| {
        GenerationError::InvalidResponse("response contains no JSON array".to_string())
    })?;

    let raw: Vec<String> = match array_elements(&json) {
        Ok(values) => values.into_iter().map(|v| v.to_string()).collect(),
        Err(e) => {
            warn!("Atomic response is not a valid JSON array ({e}); decoding objects one by one");
            top_level_objects(&json)
                .into_iter()
                .map(str::to_string)
                .collect()
        }
    };

    if raw.is_empty() {
        return Err(GenerationError::InvalidResponse(
            "response contains no commit units".to_string(),
        ));
    }

    Ok(raw
        .iter()
        .enumerate()
        .map(|(idx, element)| {
            serde_json::from_str::<CommitChange>(element).unwrap_or_else(|e| CommitChange {
                error: Some(format!("unit {} could not be decoded: {e}", idx + 1)),
                ..CommitChange::default()
            })
        })
        .collect())
}
