// src/constants.rs
//! Domain constants that define the operational boundaries of the jobs.
//!
//! Rates are empirical: each one is the pace the vendor tolerates without
//! answering 429 during a full sync.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Retry defaults
// ---------------------------------------------------------------------------

/// Attempts per logical request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Factor applied to the retry delay after each failed attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// HTTP statuses worth retrying: rate limiting and transient server errors.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Per-request timeout owned by the HTTP client.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Jira
// ---------------------------------------------------------------------------

pub const JIRA_CALLS_PER_SECOND: f64 = 10.0;
pub const JIRA_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Parent keys per JQL query. Larger `parent in (...)` clauses get 413.
pub const JIRA_PARENT_BATCH_SIZE: usize = 100;

pub const JIRA_PAGE_SIZE: usize = 100;

/// Levels below the roots before traversal stops.
pub const JIRA_MAX_HIERARCHY_DEPTH: usize = 10;

/// Issue type excluded from snapshots.
pub const JIRA_EXCLUDED_ISSUE_TYPE: &str = "Effort Estimate";

/// Characters of the summary shown per line in INDEX.md.
pub const JIRA_INDEX_SUMMARY_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// The search API allows 30 requests per minute for authenticated users.
pub const GITHUB_CALLS_PER_SECOND: f64 = 0.5;
pub const GITHUB_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const GITHUB_PAGE_SIZE: usize = 100;
pub const GITHUB_DEFAULT_ORG: &str = "galactic-empire";
pub const GITHUB_DEFAULT_LOOKBACK_DAYS: u32 = 14;
pub const GITHUB_TOKEN_PLACEHOLDER: &str = "ghp_xxxxxxxxxxxx";

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

pub const SLACK_HISTORY_CALLS_PER_SECOND: f64 = 1.0;
pub const SLACK_THREAD_CALLS_PER_SECOND: f64 = 1.25;
pub const SLACK_USER_CALLS_PER_SECOND: f64 = 10.0;
pub const SLACK_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const SLACK_HISTORY_PAGE_SIZE: usize = 100;
pub const SLACK_REPLIES_PAGE_SIZE: usize = 200;
pub const SLACK_DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Extra pause after every batch of user lookups.
pub const SLACK_USER_BATCH_SIZE: usize = 10;
pub const SLACK_USER_BATCH_PAUSE: Duration = Duration::from_millis(500);

/// Pause between channels when syncing more than one.
pub const SLACK_CHANNEL_PAUSE: Duration = Duration::from_millis(2500);

pub const SLACK_UNKNOWN_USER: &str = "Unknown User";

// ---------------------------------------------------------------------------
// RSS
// ---------------------------------------------------------------------------

pub const RSS_CALLS_PER_SECOND: f64 = 4.0;
pub const RSS_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const RSS_DEFAULT_DAYS_BACK: u32 = 7;

/// Summaries longer than this are cut and suffixed with `...`.
pub const RSS_SUMMARY_MAX_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
