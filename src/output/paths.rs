// src/output/paths.rs
//! Pure functions for path calculations and filename generation.

use std::path::{Path, PathBuf};

/// Directory layout of a context workspace.
///
/// ```text
/// <root>/
///   Sync/config.json          sync state
///   Curated-Context/          hand-maintained team and people stubs
///   Synced-Data/{Jira,GitHub,Slack,News}/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("Sync").join("config.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("Synced-Data")
    }

    pub fn jira_dir(&self) -> PathBuf {
        self.data_dir().join("Jira")
    }

    pub fn github_dir(&self) -> PathBuf {
        self.data_dir().join("GitHub")
    }

    pub fn slack_dir(&self) -> PathBuf {
        self.data_dir().join("Slack")
    }

    pub fn news_dir(&self) -> PathBuf {
        self.data_dir().join("News")
    }

    pub fn curated_dir(&self) -> PathBuf {
        self.root.join("Curated-Context")
    }

    pub fn team_stub(&self, team: &str) -> PathBuf {
        self.curated_dir()
            .join("Teams")
            .join(format!("{}.md", sanitize_filename(team)))
    }

    pub fn person_stub(&self, name: &str) -> PathBuf {
        self.curated_dir()
            .join("People")
            .join(format!("{}.md", sanitize_filename(name)))
    }
}

/// Sanitizes a string to be safe for use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    let safe_name = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();

    let safe_name = safe_name.trim().trim_matches('.');
    if safe_name.is_empty() {
        "unnamed".to_string()
    } else {
        safe_name.to_string()
    }
}
