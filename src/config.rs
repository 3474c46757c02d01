// src/config.rs
use crate::constants::GITHUB_TOKEN_PLACEHOLDER;
use crate::error::AppError;
use crate::output::DataLayout;
use crate::types::{ApiToken, BaseUrl, IssueKey, KeyPrefix};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: SyncCommand,

    /// Workspace root holding Sync/, Curated-Context/ and Synced-Data/
    #[arg(short = 'r', long, global = true, default_value = ".")]
    pub root_dir: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SyncCommand {
    /// Snapshot the Jira issue hierarchy under one or more root issues
    Jira(JiraArgs),
    /// Snapshot merged pull requests authored by team members
    Github(GithubArgs),
    /// Snapshot recent messages from configured Slack channels
    Slack(SlackArgs),
    /// Build the RSS news digest
    Rss(RssArgs),
    /// Run every job concurrently with its stored settings
    All,
}

#[derive(Args, Debug, Clone, Default)]
pub struct JiraArgs {
    /// Root issue key; repeat for several roots (e.g. --root EMP-1 --root EMP-2)
    #[arg(long = "root")]
    pub roots: Vec<String>,

    /// Only follow first-level children whose key starts with this prefix
    #[arg(long)]
    pub filter: Option<String>,

    /// Force a full sync (every run is currently a full sync)
    #[arg(long, default_value_t = false)]
    pub full: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GithubArgs {
    /// Override the lookback window in days
    #[arg(long)]
    pub lookback: Option<u32>,

    /// Sync only this team
    #[arg(long)]
    pub team: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SlackArgs {
    /// Sync a single configured channel by name
    #[arg(long)]
    pub channel: Option<String>,

    /// Override the lookback window in days
    #[arg(long)]
    pub lookback: Option<u32>,

    /// Ignore per-channel last-synced markers and fetch the whole window
    #[arg(long, default_value_t = false)]
    pub full: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RssArgs {
    /// How many days of articles to keep
    #[arg(long)]
    pub days: Option<u32>,
}

/// Validated options for the Jira job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JiraOptions {
    pub roots: Vec<IssueKey>,
    pub filter: Option<KeyPrefix>,
    pub full: bool,
}

impl TryFrom<JiraArgs> for JiraOptions {
    type Error = AppError;

    fn try_from(args: JiraArgs) -> Result<Self, Self::Error> {
        let roots = args
            .roots
            .iter()
            .map(|root| IssueKey::parse(root))
            .collect::<Result<Vec<_>, _>>()?;
        let filter = args.filter.as_deref().map(KeyPrefix::parse).transpose()?;
        Ok(Self {
            roots,
            filter,
            full: args.full,
        })
    }
}

/// Which jobs to run, with their validated options.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSelection {
    Jira(JiraOptions),
    Github(GithubOptions),
    Slack(SlackOptions),
    Rss(RssOptions),
    All,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GithubOptions {
    pub lookback_days: Option<u32>,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlackOptions {
    pub channel: Option<String>,
    pub lookback_days: Option<u32>,
    pub full: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssOptions {
    pub days_back: Option<u32>,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub layout: DataLayout,
    pub verbose: bool,
    pub jobs: JobSelection,
}

impl SyncConfig {
    /// Validates command-line input. Credentials are read later, per job.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let jobs = match cli.command {
            SyncCommand::Jira(args) => JobSelection::Jira(args.try_into()?),
            SyncCommand::Github(args) => JobSelection::Github(GithubOptions {
                lookback_days: args.lookback,
                team: args.team,
            }),
            SyncCommand::Slack(args) => JobSelection::Slack(SlackOptions {
                channel: args.channel,
                lookback_days: args.lookback,
                full: args.full,
            }),
            SyncCommand::Rss(args) => JobSelection::Rss(RssOptions {
                days_back: args.days,
            }),
            SyncCommand::All => JobSelection::All,
        };

        Ok(SyncConfig {
            layout: DataLayout::new(cli.root_dir),
            verbose: cli.verbose,
            jobs,
        })
    }
}

// --- Credentials ---

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, AppError> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::MissingConfiguration(format!("{} environment variable not set", name))
        })
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// `JIRA_EMAIL`, `JIRA_API_TOKEN` and `JIRA_BASE_URL`.
#[derive(Debug, Clone)]
pub struct JiraCredentials {
    pub email: String,
    pub token: ApiToken,
    pub base_url: BaseUrl,
}

impl JiraCredentials {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            email: required(&lookup, "JIRA_EMAIL")?,
            token: ApiToken::new(required(&lookup, "JIRA_API_TOKEN")?)?,
            base_url: BaseUrl::parse(&required(&lookup, "JIRA_BASE_URL")?)?,
        })
    }
}

/// `GITHUB_TOKEN`, a personal access token with `repo` scope.
#[derive(Debug, Clone)]
pub struct GithubCredentials {
    pub token: ApiToken,
}

impl GithubCredentials {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let token = ApiToken::new(required(&lookup, "GITHUB_TOKEN")?)?
            .reject_placeholder(GITHUB_TOKEN_PLACEHOLDER)?;
        Ok(Self { token })
    }
}

/// `SLACK_SESSION_TOKEN` (xoxc-), `SLACK_COOKIE_D` and `SLACK_WORKSPACE_URL`.
#[derive(Debug, Clone)]
pub struct SlackCredentials {
    pub token: ApiToken,
    pub cookie_d: ApiToken,
    pub workspace_url: BaseUrl,
}

impl SlackCredentials {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            token: ApiToken::new(required(&lookup, "SLACK_SESSION_TOKEN")?)?,
            cookie_d: ApiToken::new(required(&lookup, "SLACK_COOKIE_D")?)?,
            workspace_url: BaseUrl::parse(&required(&lookup, "SLACK_WORKSPACE_URL")?)?,
        })
    }
}
