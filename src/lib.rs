// src/lib.rs
//! context-sync library: batch jobs that snapshot Jira, GitHub, Slack and
//! RSS content into local JSON and Markdown files.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `SyncConfig`, per-job options and credentials
//! - **Pipeline**: `SnapshotJob`, `SyncContext`, `run_job`
//! - **Jobs**: `JiraJob`, `GithubJob`, `SlackJob`, `RssJob`
//! - **Conversion**: `document::convert` for Atlassian documents

pub mod api;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod formatting;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod state;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, SlackErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{
    CommandLineInput, GithubCredentials, GithubOptions, JiraCredentials, JiraOptions,
    JobSelection, RssOptions, SlackCredentials, SlackOptions, SyncCommand, SyncConfig,
};

// --- Domain Types ---
pub use crate::types::{ApiToken, BaseUrl, ChannelId, IssueKey, KeyPrefix};

// --- Pipeline ---
pub use crate::output::DataLayout;
pub use crate::pipeline::{run_job, JobReport, SnapshotJob, SyncContext};
pub use crate::state::SyncState;

// --- Jobs ---
pub use crate::sources::{GithubJob, JiraJob, RssJob, SlackJob};
