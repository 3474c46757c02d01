// tests/integration/mod.rs
//! Integration tests for context-sync
//!
//! Each test starts a local mock server, points a job at it and checks the
//! files and state written to a temporary workspace. The jobs use blocking
//! HTTP clients, so they are built and run on the blocking pool.


#[cfg(test)]
mod jira_sync;

#[cfg(test)]
mod github_sync;

#[cfg(test)]
mod slack_sync;

#[cfg(test)]
mod rss_sync;
