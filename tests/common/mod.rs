//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Status, StatusOptions};

use kommit::error::{GenerationError, InteractionError};
use kommit::generate::{GenerationRequest, Generator};
use kommit::git::SystemGit;
use kommit::interaction::{Prompter, UserAction};
use kommit::options::CommitOptions;

/// Options for a run that never prompts and prints nothing.
pub fn headless() -> CommitOptions {
    CommitOptions {
        no_confirm: true,
        quiet: true,
        ..CommitOptions::default()
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty repository on `main` with a local identity.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = init_repo(dir.path(), false);
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A [`SystemGit`] rooted at this repository.
    pub fn git(&self) -> SystemGit {
        SystemGit::new(self.dir.path())
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, contents).expect("Failed to write test file");
    }

    /// Add `paths` to the index.
    pub fn stage(&self, paths: &[&str]) {
        let mut index = self.repo.index().expect("Failed to get index");
        for path in paths {
            index.add_path(Path::new(path)).expect("Failed to add file");
        }
        index.write().expect("Failed to write index");
    }

    /// Stage everything and commit it. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    pub fn head_id(&self) -> Option<Oid> {
        self.repo.head().ok().and_then(|h| h.target())
    }

    pub fn head_message(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        commit.message().map(str::to_string)
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let Some(head) = self.head_id() else {
            return 0;
        };
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push(head).expect("Failed to push HEAD");
        walk.count()
    }

    /// Paths with changes in the index.
    pub fn staged_files(&self) -> BTreeSet<String> {
        self.files_with(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED,
        )
    }

    /// Paths with changes not yet in the index, untracked included.
    pub fn unstaged_files(&self) -> BTreeSet<String> {
        self.files_with(Status::WT_NEW | Status::WT_MODIFIED | Status::WT_DELETED)
    }

    fn files_with(&self, mask: Status) -> BTreeSet<String> {
        // Fresh handle: the system git rewrites the index behind our back.
        let repo = Repository::open(self.dir.path()).expect("Failed to open repo");
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut opts)).expect("Failed to read status");
        statuses
            .iter()
            .filter(|entry| entry.status().intersects(mask))
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect()
    }

    /// Whether the HEAD tree holds `path`.
    pub fn head_has(&self, path: &str) -> bool {
        let Ok(commit) = self.repo.head().and_then(|h| h.peel_to_commit()) else {
            return false;
        };
        let tree = commit.tree().expect("Failed to read tree");
        tree.get_path(Path::new(path)).is_ok()
    }

    /// Paths touched by the HEAD commit.
    pub fn head_files(&self) -> BTreeSet<String> {
        let commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to read HEAD commit");
        let tree = commit.tree().expect("Failed to read tree");
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .expect("Failed to diff trees");
        diff.deltas()
            .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
            .collect()
    }

    /// Run the system git in this repository, panicking on failure.
    pub fn run_git(&self, args: &[&str]) -> String {
        run_git_in(self.dir.path(), args)
    }

    pub fn add_remote(&self, name: &str, url: &str) {
        self.repo.remote(name, url).expect("Failed to add remote");
    }
}

/// A bare repository usable as a local `origin`.
pub struct BareRemote {
    pub dir: tempfile::TempDir,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        init_repo(dir.path(), true);
        Self { dir }
    }

    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }
}

fn init_repo(path: &Path, bare: bool) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(bare).initial_head("main");
    let repo = Repository::init_opts(path, &opts).expect("Failed to init git repo");
    {
        let mut config = repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
    }
    repo
}

pub fn run_git_in(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A [`Generator`] that replays canned replies and records every request.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// A [`Prompter`] that answers from queues; an empty queue panics.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub reviews: RefCell<VecDeque<UserAction>>,
    pub file_choices: RefCell<VecDeque<UserAction>>,
    pub edits: RefCell<VecDeque<String>>,
    pub picks: RefCell<VecDeque<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn reviews(actions: &[UserAction]) -> Self {
        let prompter = Self::default();
        prompter.reviews.borrow_mut().extend(actions.iter().copied());
        prompter
    }

    pub fn with_file_choice(self, action: UserAction) -> Self {
        self.file_choices.borrow_mut().push_back(action);
        self
    }

    pub fn with_edit(self, text: &str) -> Self {
        self.edits.borrow_mut().push_back(text.to_string());
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn review_menu(&self, _title: &str) -> Result<UserAction, InteractionError> {
        Ok(self
            .reviews
            .borrow_mut()
            .pop_front()
            .expect("unexpected review prompt"))
    }

    fn edit_text(&self, _title: &str, _initial: &str) -> Result<String, InteractionError> {
        Ok(self
            .edits
            .borrow_mut()
            .pop_front()
            .expect("unexpected editor prompt"))
    }

    fn file_menu(&self, _files: &[String]) -> Result<UserAction, InteractionError> {
        Ok(self
            .file_choices
            .borrow_mut()
            .pop_front()
            .expect("unexpected file prompt"))
    }

    fn pick_files(&self, _candidates: &[String]) -> Result<Vec<String>, InteractionError> {
        Ok(self
            .picks
            .borrow_mut()
            .pop_front()
            .expect("unexpected file picker"))
    }
}

pub fn strings(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
