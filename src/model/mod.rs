// src/model/mod.rs
//! Vendor payloads and the snapshot schemas written to disk.
//!
//! Each submodule pairs loosely-typed `Deserialize` structs for what the
//! vendor sends with strict `Serialize` structs for what we persist.

pub mod feed;
pub mod github;
pub mod jira;
pub mod slack;

pub use feed::{Article, Digest};
pub use github::{MemberSummary, PullRequest, PullRequestSummary, SearchItem, SearchPage};
pub use jira::{IndexEntry, JiraIssue, RawIssue, RawSearchPage};
pub use slack::{ChannelSnapshot, Message, RawMessage, Reply};
