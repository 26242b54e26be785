//! Working-tree status entries read through git2.

use std::fmt;

use git2::{Repository, Status, StatusOptions};

use crate::error::GitError;

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
            FileStatus::Untracked => write!(f, "Untracked"),
        }
    }
}

impl FileStatus {
    /// Collapse a git2 status bitset into a single label.
    ///
    /// Index changes win over worktree changes, since they are what a commit
    /// would record first. Returns `None` for clean or ignored entries.
    pub fn from_git2(status: Status) -> Option<Self> {
        if status.is_ignored() {
            return None;
        }
        if status.is_index_new() {
            Some(FileStatus::Added)
        } else if status.is_index_renamed() || status.is_wt_renamed() {
            Some(FileStatus::Renamed)
        } else if status.is_index_deleted() || status.is_wt_deleted() {
            Some(FileStatus::Deleted)
        } else if status.is_index_modified()
            || status.is_wt_modified()
            || status.is_index_typechange()
            || status.is_wt_typechange()
        {
            Some(FileStatus::Modified)
        } else if status.is_wt_new() {
            Some(FileStatus::Untracked)
        } else {
            None
        }
    }
}

/// A changed path in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    /// Source path of a staged rename.
    pub old_path: Option<String>,
}

/// Read every pending change, tracked or untracked, in path order.
pub fn collect_changes(repo: &Repository) -> Result<Vec<FileChange>, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts)).map_err(GitError::Repository)?;

    let mut changes = Vec::new();
    for entry in statuses.iter() {
        let Some(status) = FileStatus::from_git2(entry.status()) else {
            continue;
        };
        // Renames report both paths through the head-to-index delta.
        let staged = entry.head_to_index();
        let path = staged
            .as_ref()
            .and_then(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
            .or_else(|| entry.path().map(str::to_string));
        let old_path = staged
            .filter(|_| status == FileStatus::Renamed)
            .and_then(|d| d.old_file().path().map(|p| p.to_string_lossy().into_owned()))
            .filter(|old| Some(old) != path.as_ref());
        if let Some(path) = path {
            changes.push(FileChange {
                path,
                status,
                old_path,
            });
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_with_commit() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("tracked.txt"), "original\n").unwrap();
        {
            let mut index = repo.index().unwrap();
            index.add_path(std::path::Path::new("tracked.txt")).unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = git2::Signature::now("Test", "test@test.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
        }
        (dir, repo)
    }

    #[test]
    fn test_file_status_display() {
        assert_eq!(FileStatus::Added.to_string(), "Added");
        assert_eq!(FileStatus::Untracked.to_string(), "Untracked");
        assert_eq!(FileStatus::Renamed.to_string(), "Renamed");
    }

    #[test]
    fn test_from_git2_prefers_index_state() {
        let status = Status::INDEX_NEW | Status::WT_MODIFIED;
        assert_eq!(FileStatus::from_git2(status), Some(FileStatus::Added));
        assert_eq!(FileStatus::from_git2(Status::WT_NEW), Some(FileStatus::Untracked));
        assert_eq!(FileStatus::from_git2(Status::IGNORED), None);
        assert_eq!(FileStatus::from_git2(Status::CURRENT), None);
    }

    #[test]
    fn test_collect_changes_clean_repo_is_empty() {
        let (_dir, repo) = init_with_commit();
        assert!(collect_changes(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_collect_changes_includes_nested_untracked() {
        let (dir, repo) = init_with_commit();
        std::fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        std::fs::write(dir.path().join("src/deep/new.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("tracked.txt"), "changed\n").unwrap();

        let changes = collect_changes(&repo).unwrap();
        assert!(changes.contains(&FileChange {
            path: "src/deep/new.rs".to_string(),
            status: FileStatus::Untracked,
            old_path: None,
        }));
        assert!(changes.contains(&FileChange {
            path: "tracked.txt".to_string(),
            status: FileStatus::Modified,
            old_path: None,
        }));
    }

    #[test]
    fn test_collect_changes_reports_deletions() {
        let (dir, repo) = init_with_commit();
        std::fs::remove_file(dir.path().join("tracked.txt")).unwrap();

        let changes = collect_changes(&repo).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, FileStatus::Deleted);
    }

    #[test]
    fn test_collect_changes_keeps_rename_source() {
        let (dir, repo) = init_with_commit();
        std::fs::rename(dir.path().join("tracked.txt"), dir.path().join("moved.txt")).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(std::path::Path::new("tracked.txt")).unwrap();
        index.add_path(std::path::Path::new("moved.txt")).unwrap();
        index.write().unwrap();

        let changes = collect_changes(&repo).unwrap();
        assert_eq!(
            changes,
            vec![FileChange {
                path: "moved.txt".to_string(),
                status: FileStatus::Renamed,
                old_path: Some("tracked.txt".to_string()),
            }]
        );
    }
}
