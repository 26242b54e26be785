//! kommit - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::debug;

use kommit::config::{ConfigKey, GEMINI_API_KEY_ENV, Settings};
use kommit::generate::GeminiClient;
use kommit::git::SystemGit;
use kommit::github::{GitHubHost, get_github_token};
use kommit::interaction::DialoguerPrompter;
use kommit::logging;
use kommit::options::{CommitFlags, resolve_issue_patterns};
use kommit::workflow::{Outcome, Workflow};

/// Write commit messages and pull requests from your changes using Gemini.
#[derive(Parser, Debug)]
#[command(name = "kommit")]
#[command(about = "Write commit messages and pull requests from your changes using Gemini")]
#[command(version)]
struct Cli {
    /// Settings file (default is <config dir>/kommit/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Boolean flags accept `--flag`, `--flag=true` or `--flag=false`, so a
/// setting enabled in the config file can be switched off for one run.
#[derive(Args, Debug)]
struct RunArgs {
    /// Stage all changes before generating
    #[arg(short = 'a', long = "all", global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    stage_all: Option<bool>,

    /// Let the model pick which changed files belong in the commit
    #[arg(long = "auto", global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    auto_select: Option<bool>,

    /// Split the pending changes into several commits
    #[arg(long, global = true, conflicts_with = "auto_select")]
    atomic: bool,

    /// Skip the confirmation prompts
    #[arg(short = 'y', long = "yes", global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    no_confirm: Option<bool>,

    /// Suppress output (only with --yes)
    #[arg(short = 'q', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    quiet: Option<bool>,

    /// Push after committing
    #[arg(short = 'p', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    push: Option<bool>,

    /// Show what would happen without changing anything
    #[arg(short = 'd', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    dry_run: Option<bool>,

    /// Print the diff before generating
    #[arg(short = 's', long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    show_diff: Option<bool>,

    /// Skip git hooks when committing
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    no_verify: Option<bool>,

    /// Extra context for the model
    #[arg(short = 'c', long = "context", global = true)]
    user_context: Option<String>,

    /// Gemini model to use
    #[arg(short = 'm', long, global = true)]
    model: Option<String>,

    /// Maximum length of the commit message or pull request title
    #[arg(short = 'l', long, global = true)]
    max_length: Option<usize>,

    /// Language to write in
    #[arg(short = 'g', long, global = true)]
    language: Option<String>,

    /// Issue to reference (detected from the branch name when omitted)
    #[arg(short = 'i', long, global = true)]
    issue: Option<String>,

    /// Gemini API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

impl RunArgs {
    fn flags(&self) -> CommitFlags {
        CommitFlags {
            stage_all: self.stage_all,
            auto_select: self.auto_select,
            atomic: self.atomic,
            no_confirm: self.no_confirm,
            quiet: self.quiet,
            push: self.push,
            dry_run: self.dry_run,
            show_diff: self.show_diff,
            no_verify: self.no_verify,
            user_context: self.user_context.clone(),
            model: self.model.clone(),
            max_length: self.max_length,
            language: self.language.clone(),
            issue: self.issue.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the current branch and open a pull request
    Pr {
        /// Open the pull request as a draft
        #[arg(long)]
        draft: bool,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective value of a key
    Get { key: String },

    /// Set a key (list keys take several values)
    Set {
        key: String,
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
    },

    /// Print every key with its effective value
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(Outcome::Completed | Outcome::Cancelled) => ExitCode::SUCCESS,
        Ok(Outcome::PartiallyCompleted) => ExitCode::from(2),
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    if let Some(Command::Config { action }) = &cli.command {
        run_config(&mut settings, action)?;
        return Ok(Outcome::Completed);
    }

    let opts = cli.run.flags().resolve(&settings)?;
    let patterns = resolve_issue_patterns(&settings)?;

    let api_key = settings.api_key()?.ok_or_else(|| {
        anyhow!(
            "No Gemini API key configured. Run 'kommit config set {} <key>' or set {GEMINI_API_KEY_ENV}",
            ConfigKey::ApiKey
        )
    })?;
    let base_url = match &cli.run.base_url {
        Some(url) => Some(url.clone()),
        None => settings.string(ConfigKey::ApiBaseUrl)?,
    };
    let generator = GeminiClient::new(api_key, base_url.as_deref())
        .context("Failed to set up the Gemini client")?;

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let git = SystemGit::new(cwd);
    let workflow = Workflow::new(&git, &generator, DialoguerPrompter::new(), opts);

    let outcome = match cli.command {
        Some(Command::Pr { draft }) => {
            let host = github_host(workflow.options().dry_run)?;
            workflow.run_pull_request(&patterns, draft, &host).await?
        }
        _ => workflow.run_commit(&patterns).await?,
    };
    Ok(outcome)
}

/// Dry runs never reach the API, so they work without a token.
fn github_host(dry_run: bool) -> Result<GitHubHost> {
    match get_github_token() {
        Ok(token) => Ok(GitHubHost::new(&token)?),
        Err(e) if dry_run => {
            debug!("No GitHub token for dry run: {e}");
            Ok(GitHubHost::anonymous()?)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_config(settings: &mut Settings, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let key: ConfigKey = key.parse()?;
            let value = settings.masked_value(key)?;
            println!("{}", value.unwrap_or_else(|| "(not set)".to_string()));
        }
        ConfigAction::Set { key, values } => {
            let key: ConfigKey = key.parse()?;
            settings.set(key, values)?;
            settings.save()?;
            println!(
                "{} {key} saved to {}",
                style("✔").green(),
                settings.path().display()
            );
        }
        ConfigAction::List => {
            for (key, value) in settings.entries()? {
                let value = value.unwrap_or_else(|| "(not set)".to_string());
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
