// src/main.rs

use anyhow::Context;
use clap::Parser;
use context_sync::config::{
    GithubCredentials, GithubOptions, JiraCredentials, JiraOptions, RssOptions, SlackCredentials,
    SlackOptions,
};
use context_sync::{
    run_job, AppError, CommandLineInput, GithubJob, JiraJob, JobReport, JobSelection, RssJob,
    SlackJob, SyncConfig, SyncContext,
};
use futures::future::join_all;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("context_sync.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config).context("installing logger")?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn sync_jira(options: JiraOptions, ctx: &SyncContext) -> Result<JobReport, AppError> {
    let job = JiraJob::new(JiraCredentials::from_env()?, options)?;
    run_job(&job, ctx)
}

fn sync_github(options: GithubOptions, ctx: &SyncContext) -> Result<JobReport, AppError> {
    let job = GithubJob::new(GithubCredentials::from_env()?, options)?;
    run_job(&job, ctx)
}

fn sync_slack(options: SlackOptions, ctx: &SyncContext) -> Result<JobReport, AppError> {
    let job = SlackJob::new(SlackCredentials::from_env()?, options)?;
    run_job(&job, ctx)
}

fn sync_rss(options: RssOptions, ctx: &SyncContext) -> Result<JobReport, AppError> {
    let job = RssJob::new(options)?;
    run_job(&job, ctx)
}

type JobRun = (&'static str, Result<JobReport, AppError>);

/// Runs one job on the blocking pool; the HTTP clients are blocking.
fn spawn_job<F>(ctx: &Arc<SyncContext>, job: F) -> JoinHandle<Result<JobReport, AppError>>
where
    F: FnOnce(&SyncContext) -> Result<JobReport, AppError> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    tokio::task::spawn_blocking(move || job(&ctx))
}

/// Executes the selected jobs. `all` runs the four jobs side by side.
async fn execute(selection: JobSelection, ctx: Arc<SyncContext>) -> Vec<JobRun> {
    let spawned = match selection {
        JobSelection::Jira(options) => vec![("jira", spawn_job(&ctx, move |ctx| sync_jira(options, ctx)))],
        JobSelection::Github(options) => {
            vec![("github", spawn_job(&ctx, move |ctx| sync_github(options, ctx)))]
        }
        JobSelection::Slack(options) => {
            vec![("slack", spawn_job(&ctx, move |ctx| sync_slack(options, ctx)))]
        }
        JobSelection::Rss(options) => vec![("rss", spawn_job(&ctx, move |ctx| sync_rss(options, ctx)))],
        JobSelection::All => vec![
            ("jira", spawn_job(&ctx, |ctx| sync_jira(JiraOptions::default(), ctx))),
            ("github", spawn_job(&ctx, |ctx| sync_github(GithubOptions::default(), ctx))),
            ("slack", spawn_job(&ctx, |ctx| sync_slack(SlackOptions::default(), ctx))),
            ("rss", spawn_job(&ctx, |ctx| sync_rss(RssOptions::default(), ctx))),
        ],
    };

    let (names, handles): (Vec<&'static str>, Vec<_>) = spawned.into_iter().unzip();
    names
        .into_iter()
        .zip(join_all(handles).await)
        .map(|(name, joined)| {
            let outcome = joined.unwrap_or_else(|e| {
                Err(AppError::InternalError {
                    message: format!("{} job panicked or was cancelled", name),
                    source: Some(Box::new(e)),
                })
            });
            (name, outcome)
        })
        .collect()
}

/// Prints one line per job and returns whether every job succeeded.
fn report_completion(runs: &[JobRun]) -> bool {
    let mut all_ok = true;
    for (name, outcome) in runs {
        match outcome {
            Ok(report) => {
                let marker = if report.is_success() { "✓" } else { "⚠️ " };
                println!("{} {}: {}", marker, name, report);
                for detail in &report.details {
                    println!("    {}", detail);
                }
                for failure in &report.failures {
                    println!("    ✗ {}", failure);
                }
                all_ok &= report.is_success();
            }
            Err(e) => {
                eprintln!("✗ {}: {}", name, e);
                all_ok = false;
            }
        }
    }
    all_ok
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = SyncConfig::resolve(cli).context("invalid command line")?;
    let ctx = Arc::new(SyncContext::load(config.layout).context("loading sync state")?);

    let runs = execute(config.jobs, ctx).await;

    if report_completion(&runs) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
