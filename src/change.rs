//! The change set a generated message describes.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

/// Files and diff being described, plus best-effort context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Paths in detection order.
    pub files: Vec<String>,
    pub diff: String,
    /// Directory → comma-joined sibling entries.
    pub related_files: BTreeMap<String, String>,
    pub issue: Option<String>,
    /// Renamed path → the path it was renamed from.
    pub renamed_from: BTreeMap<String, String>,
}

impl ChangeSet {
    pub fn new(files: Vec<String>, diff: String) -> Self {
        Self {
            files,
            diff,
            ..Self::default()
        }
    }

    /// A copy restricted to `files`, with the diff and context cut down to match.
    pub fn subset(&self, files: &[String]) -> ChangeSet {
        let mut unit = ChangeSet {
            files: files.to_vec(),
            diff: filter_diff(&self.diff, files),
            related_files: self.related_files.clone(),
            issue: self.issue.clone(),
            renamed_from: self.renamed_from.clone(),
        };
        unit.prune_context();
        unit
    }

    /// Narrow to an adopted subset, keeping detection order.
    pub fn narrow(&mut self, adopted: &[String]) {
        let keep: HashSet<&str> = adopted.iter().map(String::as_str).collect();
        self.files.retain(|f| keep.contains(f.as_str()));
        self.diff = filter_diff(&self.diff, &self.files);
        self.prune_context();
    }

    /// Paths git must see to record these files, rename sources included.
    pub fn pathspecs(&self) -> Vec<String> {
        let mut specs = self.files.clone();
        for file in &self.files {
            if let Some(old) = self.renamed_from.get(file)
                && !specs.contains(old)
            {
                specs.push(old.clone());
            }
        }
        specs
    }

    fn prune_context(&mut self) {
        let dirs: HashSet<String> = self.files.iter().map(String::as_str).map(parent_dir).collect();
        self.related_files.retain(|dir, _| dirs.contains(dir));
        let files: HashSet<&str> = self.files.iter().map(String::as_str).collect();
        self.renamed_from.retain(|new, _| files.contains(new.as_str()));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

/// One proposed unit in atomic-commit mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitChange {
    #[serde(default)]
    pub commit_message: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub file_identifiers: Vec<String>,
    /// Why this unit could not be decoded, if it couldn't.
    #[serde(skip)]
    pub error: Option<String>,
}

/// List siblings of each changed file's directory, once per directory.
///
/// Unreadable directories are left out.
pub fn related_files(root: &Path, files: &[String]) -> BTreeMap<String, String> {
    let mut related = BTreeMap::new();
    let mut visited = HashSet::new();

    for file in files {
        let dir = parent_dir(file);
        if !visited.insert(dir.clone()) {
            continue;
        }

        let entries = match std::fs::read_dir(root.join(&dir)) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping related files for {dir}: {e}");
                continue;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name != ".git")
            .collect();
        names.sort();
        related.insert(dir, names.join(", "));
    }

    related
}

/// Directory key used in the related-files map; `.` for the root.
fn parent_dir(file: &str) -> String {
    match Path::new(file).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    }
}

/// Keep only the `diff --git` sections that touch one of `files`.
pub fn filter_diff(diff: &str, files: &[String]) -> String {
    let wanted: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut out = String::new();
    let mut keep = false;

    for line in diff.split_inclusive('\n') {
        if let Some(header) = line.strip_prefix("diff --git ") {
            keep = section_paths(header.trim_end())
                .iter()
                .any(|p| wanted.contains(p));
        }
        if keep {
            out.push_str(line);
        }
    }

    out
}

/// Old and new paths from a `diff --git a/<old> b/<new>` header.
fn section_paths(header: &str) -> Vec<&str> {
    let Some(split) = header.rfind(" b/") else {
        return Vec::new();
    };
    let old = header[..split].strip_prefix("a/").unwrap_or(&header[..split]);
    let new = &header[split + 3..];
    vec![old, new]
}
