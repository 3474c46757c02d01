// src/sources/mod.rs
//! One [`SnapshotJob`](crate::pipeline::SnapshotJob) per vendor.

pub mod github;
pub mod jira;
pub mod rss;
pub mod slack;

pub use github::GithubJob;
pub use jira::JiraJob;
pub use rss::RssJob;
pub use slack::SlackJob;
