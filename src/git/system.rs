//! [`VersionControl`] backed by the system `git` binary and git2.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{ErrorCode, Repository};
use regex_lite::Regex;
use tracing::debug;

use crate::error::GitError;
use crate::git::status::{self, FileChange, FileStatus};
use crate::git::untracked::synthesize_diff;
use crate::git::VersionControl;

/// Runs git against one working directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
}

impl SystemGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::discover(&self.workdir).map_err(GitError::NotARepository)
    }

    fn run_git(&self, args: &[&str], operation: &str) -> Result<String, GitError> {
        run_git_in(&self.workdir, args, operation)
    }

    /// Path-scoped commands run from the top level, where status paths are rooted.
    fn run_git_at_root(&self, args: &[&str], operation: &str) -> Result<String, GitError> {
        let root = self.toplevel()?;
        run_git_in(&root, args, operation)
    }

    /// `git add -A` over the paths git can still match.
    ///
    /// A rename source that is already gone from both the index and the
    /// working tree would make the whole `add` fail, so it is left out.
    fn add_paths(&self, paths: &[String]) -> Result<(), GitError> {
        let repo = self.open()?;
        let root = self.toplevel()?;
        let index = repo.index().map_err(GitError::Repository)?;

        let mut args = vec!["add", "-A", "--"];
        let before = args.len();
        for path in paths {
            let known = root.join(path).symlink_metadata().is_ok()
                || index.get_path(Path::new(path), 0).is_some();
            if known {
                args.push(path.as_str());
            } else {
                debug!("Not adding {path}: neither in the index nor on disk");
            }
        }
        if args.len() == before {
            return Ok(());
        }
        run_git_in(&root, &args, "add").map(|_| ())
    }
}

/// Run a git command and return its stdout, or stderr as the error.
fn run_git_in(dir: &Path, args: &[&str], operation: &str) -> Result<String, GitError> {
    debug!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| GitError::Spawn {
            operation: operation.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // Hooks and `git commit` with nothing to commit report on stdout.
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(GitError::CommandFailed {
            operation: operation.to_string(),
            stderr: detail,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pull `HEAD branch: <name>` out of `git remote show` output.
fn parse_head_branch(output: &str) -> Option<String> {
    let re = Regex::new(r"HEAD branch: (.*)").ok()?;
    let branch = re.captures(output)?.get(1)?.as_str().trim();
    if branch.is_empty() || branch == "(unknown)" {
        None
    } else {
        Some(branch.to_string())
    }
}

impl VersionControl for SystemGit {
    fn verify_installed(&self) -> Result<(), GitError> {
        if which::which("git").is_err() {
            return Err(GitError::NotInstalled);
        }
        self.run_git(&["--version"], "version check")
            .map(|_| ())
            .map_err(|_| GitError::NotInstalled)
    }

    fn verify_repository(&self) -> Result<(), GitError> {
        let repo = self.open()?;
        if repo.is_bare() {
            return Err(GitError::BareRepository);
        }
        Ok(())
    }

    fn toplevel(&self) -> Result<PathBuf, GitError> {
        let repo = self.open()?;
        repo.workdir()
            .map(Path::to_path_buf)
            .ok_or(GitError::BareRepository)
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.run_git(&["add", "--all"], "add --all").map(|_| ())
    }

    fn staged_changes(&self) -> Result<(Vec<String>, String), GitError> {
        let names = self.run_git(
            &["diff", "--cached", "--diff-algorithm=minimal", "--name-only"],
            "diff --cached --name-only",
        )?;
        let files = non_empty_lines(&names);
        if files.is_empty() {
            return Err(GitError::NothingToAnalyze);
        }

        let diff = self.run_git(
            &["diff", "--cached", "--diff-algorithm=minimal"],
            "diff --cached",
        )?;
        Ok((files, diff))
    }

    fn all_changes(&self) -> Result<Vec<FileChange>, GitError> {
        let repo = self.open()?;
        status::collect_changes(&repo)
    }

    fn diff_including_untracked(&self) -> Result<String, GitError> {
        let mut diff = self.run_git(
            &["diff", "--cached", "--diff-algorithm=minimal"],
            "diff --cached",
        )?;
        diff.push_str(&self.run_git(&["diff", "--diff-algorithm=minimal"], "diff")?);

        let root = self.toplevel()?;
        for change in self.all_changes()? {
            if change.status != FileStatus::Untracked {
                continue;
            }
            if let Some(addition) = synthesize_diff(&root, &change.path) {
                if !diff.is_empty() && !diff.ends_with('\n') {
                    diff.push('\n');
                }
                diff.push_str(&addition);
            }
        }

        Ok(diff)
    }

    fn commit(&self, message: &str, no_verify: bool, scope: &[String]) -> Result<(), GitError> {
        let mut args = vec!["commit", "-m", message];
        if no_verify {
            args.push("--no-verify");
        }

        if scope.is_empty() {
            return self.run_git(&args, "commit").map(|_| ());
        }

        // Untracked and deleted paths must be in the index before a pathspec commit.
        self.add_paths(scope)?;

        args.push("--");
        args.extend(scope.iter().map(String::as_str));
        self.run_git_at_root(&args, "commit").map(|_| ())
    }

    fn push(&self) -> Result<(), GitError> {
        self.run_git(&["push"], "push").map(|_| ())
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["push", "-u", remote, branch], "push -u")
            .map(|_| ())
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run_git(&["fetch", remote], "fetch").map(|_| ())
    }

    fn reset_staged(&self) -> Result<(), GitError> {
        let repo = self.open()?;
        let unborn = match repo.head() {
            Ok(_) => false,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                true
            }
            Err(e) => return Err(GitError::Repository(e)),
        };

        if unborn {
            // `git reset` needs a HEAD commit; drop everything from the index instead.
            self.run_git_at_root(
                &["rm", "--cached", "-r", "-q", "--ignore-unmatch", "."],
                "rm --cached",
            )
            .map(|_| ())
        } else {
            self.run_git(&["reset", "-q"], "reset").map(|_| ())
        }
    }

    fn stage_files(&self, files: &[String]) -> Result<(), GitError> {
        if files.is_empty() {
            return Ok(());
        }
        self.add_paths(files)
    }

    fn current_branch(&self) -> Result<String, GitError> {
        let branch = self.run_git(&["branch", "--show-current"], "branch --show-current")?;
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::DetachedHead);
        }
        Ok(branch.to_string())
    }

    fn remote_name(&self) -> Result<String, GitError> {
        let repo = self.open()?;
        let remotes = repo.remotes().map_err(GitError::Repository)?;
        let names: Vec<&str> = remotes.iter().flatten().collect();

        if names.contains(&"origin") {
            return Ok("origin".to_string());
        }
        names
            .first()
            .map(|name| name.to_string())
            .ok_or(GitError::NoRemotes)
    }

    fn remote_url(&self, remote: &str) -> Result<String, GitError> {
        let repo = self.open()?;
        let found = repo.find_remote(remote).map_err(GitError::Repository)?;
        found
            .url()
            .map(str::to_string)
            .ok_or_else(|| GitError::CommandFailed {
                operation: "remote url".to_string(),
                stderr: format!("remote '{remote}' has no URL"),
            })
    }

    fn default_branch(&self, remote: &str) -> Result<String, GitError> {
        let head_ref = format!("refs/remotes/{remote}/HEAD");
        match self.run_git(&["symbolic-ref", "--short", &head_ref], "symbolic-ref") {
            Ok(out) => {
                let prefix = format!("{remote}/");
                if let Some(branch) = out.trim().strip_prefix(&prefix)
                    && !branch.is_empty()
                {
                    return Ok(branch.to_string());
                }
            }
            Err(e) => debug!("No local {head_ref}, asking the remote: {e}"),
        }

        let out = self.run_git(&["remote", "show", remote], "remote show")?;
        parse_head_branch(&out).ok_or_else(|| GitError::DefaultBranchUnknown(remote.to_string()))
    }

    fn diff_against(&self, base: &str) -> Result<(Vec<String>, String), GitError> {
        let range = format!("{base}...HEAD");
        let names = self.run_git(&["diff", "--name-only", &range], "diff --name-only")?;
        let diff = self.run_git(&["diff", "--diff-algorithm=minimal", &range], "diff")?;
        Ok((non_empty_lines(&names), diff))
    }
}
