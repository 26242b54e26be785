//! End-to-end commit runs against real repositories with scripted generation.

mod common;

use common::{ScriptedGenerator, ScriptedPrompter, TestRepo, headless, strings};
use kommit::error::WorkflowError;
use kommit::git::IssuePatterns;
use kommit::interaction::UserAction;
use kommit::options::CommitOptions;
use kommit::workflow::{Outcome, Workflow};

const MAIN_GO: &str = "package main\n\nfunc main() {\n\tprintln(\"hi\")\n}\n";

#[tokio::test]
async fn test_prompt_carries_diff_and_constraints() {
    let repo = TestRepo::new();
    repo.write("src/main.go", MAIN_GO);
    repo.stage(&["src/main.go"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat(main): add entry point"]);
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), headless());

    let outcome = workflow.run_commit(&IssuePatterns::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("Maximum commit message length: 72 characters"));
    assert!(prompt.contains("Language: english"));
    assert!(prompt.contains("- src/main.go"));
    assert!(prompt.contains("+package main"));
    assert!(prompt.contains("+\tprintln(\"hi\")"));
    assert!(prompt.contains("src: main.go"));

    assert_eq!(
        repo.head_message().as_deref(),
        Some("feat(main): add entry point\n")
    );
}

#[tokio::test]
async fn test_issue_detected_from_branch_name() {
    let repo = TestRepo::new();
    repo.write("README.md", "readme\n");
    repo.commit_all("chore: init");
    repo.run_git(&["checkout", "-q", "-b", "feature/ISSUE-482-login"]);

    repo.write("login.rs", "fn login() {}\n");
    repo.stage(&["login.rs"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat: add login"]);
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), headless());
    workflow.run_commit(&IssuePatterns::default()).await.unwrap();

    assert!(generator.prompts()[0].contains("Issue reference: ISSUE-482"));
}

#[tokio::test]
async fn test_whitespace_generation_makes_no_commit() {
    let repo = TestRepo::new();
    repo.write("README.md", "readme\n");
    let first = repo.commit_all("chore: init");
    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["   \n  "]);
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), headless());

    let err = workflow
        .run_commit(&IssuePatterns::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no commit messages were generated. try again");
    assert_eq!(repo.head_id(), Some(first));
    assert_eq!(repo.staged_files(), strings(&["a.txt"]));
}

#[tokio::test]
async fn test_nothing_staged_is_a_user_error() {
    let repo = TestRepo::new();
    repo.write("a.txt", "alpha\n");

    let git = repo.git();
    let generator = ScriptedGenerator::new(&[]);
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), headless());

    let err = workflow
        .run_commit(&IssuePatterns::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NoStagedChanges));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_stage_all_flag_stages_before_detection() {
    let repo = TestRepo::new();
    repo.write("a.txt", "alpha\n");
    repo.write("b.txt", "beta\n");

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["chore: add files"]);
    let opts = CommitOptions {
        stage_all: true,
        ..headless()
    };
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), opts);
    workflow.run_commit(&IssuePatterns::default()).await.unwrap();

    assert_eq!(repo.head_files(), strings(&["a.txt", "b.txt"]));
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let repo = TestRepo::new();
    repo.write("README.md", "readme\n");
    let first = repo.commit_all("chore: init");
    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat: add a"]);
    let opts = CommitOptions {
        dry_run: true,
        push: true,
        ..headless()
    };
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), opts);

    let outcome = workflow.run_commit(&IssuePatterns::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(repo.head_id(), Some(first));
    assert_eq!(repo.staged_files(), strings(&["a.txt"]));
}

#[tokio::test]
async fn test_push_failure_keeps_commit() {
    let repo = TestRepo::new();
    repo.write("README.md", "readme\n");
    let first = repo.commit_all("chore: init");
    repo.add_remote("origin", "/nonexistent/kommit/remote.git");

    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat: add a"]);
    let opts = CommitOptions {
        push: true,
        ..headless()
    };
    let workflow = Workflow::new(&git, &generator, ScriptedPrompter::default(), opts);

    let outcome = workflow.run_commit(&IssuePatterns::default()).await.unwrap();
    assert_eq!(outcome, Outcome::PartiallyCompleted);
    assert_ne!(repo.head_id(), Some(first));
    assert_eq!(repo.head_message().as_deref(), Some("feat: add a\n"));
}

#[tokio::test]
async fn test_regenerate_then_edit() {
    let repo = TestRepo::new();
    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat: first try", "feat: second try"]);
    let prompter = ScriptedPrompter::reviews(&[UserAction::Regenerate, UserAction::Edit])
        .with_edit("feat(a): add alpha file");
    let workflow = Workflow::new(&git, &generator, prompter, CommitOptions::default());

    let outcome = workflow.run_commit(&IssuePatterns::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert_eq!(
        repo.head_message().as_deref(),
        Some("feat(a): add alpha file\n")
    );
}

#[tokio::test]
async fn test_edit_context_regenerates_with_new_context() {
    let repo = TestRepo::new();
    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["chore: add file", "fix: close the login hole"]);
    let prompter = ScriptedPrompter::reviews(&[UserAction::EditContext, UserAction::Confirm])
        .with_edit("this fixes the login hole");
    let workflow = Workflow::new(&git, &generator, prompter, CommitOptions::default());

    workflow.run_commit(&IssuePatterns::default()).await.unwrap();

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("this fixes the login hole"));
    assert!(prompts[1].contains("this fixes the login hole"));
    assert_eq!(
        repo.head_message().as_deref(),
        Some("fix: close the login hole\n")
    );
}

#[tokio::test]
async fn test_cancel_leaves_repository_untouched() {
    let repo = TestRepo::new();
    repo.write("README.md", "readme\n");
    let first = repo.commit_all("chore: init");
    repo.write("a.txt", "alpha\n");
    repo.stage(&["a.txt"]);

    let git = repo.git();
    let generator = ScriptedGenerator::new(&["feat: add a"]);
    let prompter = ScriptedPrompter::reviews(&[UserAction::Cancel]);
    let workflow = Workflow::new(&git, &generator, prompter, CommitOptions::default());

    let outcome = workflow.run_commit(&IssuePatterns::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(repo.head_id(), Some(first));
    assert_eq!(repo.staged_files(), strings(&["a.txt"]));
}
