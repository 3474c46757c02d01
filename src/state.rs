// src/state.rs
//! Persistent sync state (`Sync/config.json`).
//!
//! The file doubles as job configuration (roots, teams, channels, feeds) and
//! as a record of the last run. Keys this crate does not know about are kept
//! in `extra` maps and written back unchanged.

use crate::error::AppError;
use crate::output::to_json_document;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

type Extra = IndexMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss: Option<RssState>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_issues: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_issues: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl JiraState {
    /// Configured roots: `root_issues`, else the legacy single `root_issue`.
    pub fn configured_roots(&self) -> Vec<String> {
        match (&self.root_issues, &self.root_issue) {
            (Some(roots), _) => roots.clone(),
            (None, Some(root)) => vec![root.clone()],
            (None, None) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_prs: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<ChannelConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_threads: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_channels: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_messages: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChannelConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssState {
    /// category → feed name → URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeds: Option<IndexMap<String, IndexMap<String, String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_back: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_articles: Option<usize>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SyncState {
    /// Loads the state file; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("No state file at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| AppError::JsonParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves the state with two-space indentation and a trailing newline.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, to_json_document(self)?)?;
        log::debug!("Saved sync state to {}", path.display());
        Ok(())
    }

    pub fn jira_mut(&mut self) -> &mut JiraState {
        self.jira.get_or_insert_with(Default::default)
    }

    pub fn github_mut(&mut self) -> &mut GithubState {
        self.github.get_or_insert_with(Default::default)
    }

    pub fn slack_mut(&mut self) -> &mut SlackState {
        self.slack.get_or_insert_with(Default::default)
    }

    pub fn rss_mut(&mut self) -> &mut RssState {
        self.rss.get_or_insert_with(Default::default)
    }
}
