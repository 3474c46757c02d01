// src/model/github.rs
//! GitHub search results and the pull-request snapshot schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static JIRA_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][A-Z0-9]+-\d+").expect("jira key regex is valid"));
static PR_REPO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/([^/]+/[^/]+)/pull/").expect("repo regex is valid"));

/// One page of `GET /search/issues`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub user: Option<SearchUser>,
    pub created_at: Option<String>,
    pub pull_request: Option<PullRequestRef>,
    pub labels: Option<Vec<SearchLabel>>,
    pub comments: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchUser {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestRef {
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchLabel {
    pub name: Option<String>,
}

/// A merged pull request as written to `GitHub/pull-requests/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub repo: String,
    pub title: String,
    pub author: String,
    pub author_name: String,
    pub team: String,
    pub state: String,
    pub created_at: Option<String>,
    pub merged_at: Option<String>,
    pub url: String,
    pub jira_keys: Vec<String>,
    pub labels: Vec<String>,
    pub comments: u64,
}

impl PullRequest {
    pub fn from_search_item(item: SearchItem, author_name: &str, team: &str) -> Self {
        let url = item.html_url.unwrap_or_default();
        let title = item.title.unwrap_or_default();
        Self {
            number: item.number,
            repo: repo_from_url(&url),
            jira_keys: jira_keys(&title),
            title,
            author: item.user.and_then(|u| u.login).unwrap_or_default(),
            author_name: author_name.to_string(),
            team: team.to_string(),
            state: "merged".to_string(),
            created_at: item.created_at,
            merged_at: item.pull_request.and_then(|pr| pr.merged_at),
            url,
            labels: item
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|label| label.name.unwrap_or_default())
                .collect(),
            comments: item.comments.unwrap_or(0),
        }
    }

    /// `owner_repo_number.json`, the per-PR snapshot file name.
    pub fn file_name(&self) -> String {
        let number = self.number.map(|n| n.to_string()).unwrap_or_default();
        format!("{}_{}.json", self.repo.replace('/', "_"), number)
    }

    /// Repository name without the owner.
    pub fn repo_short(&self) -> &str {
        self.repo.rsplit('/').next().unwrap_or(&self.repo)
    }

    pub fn merged_sort_key(&self) -> &str {
        self.merged_at.as_deref().unwrap_or_default()
    }
}

/// Lowercased `owner/name` parsed from a PR URL; empty when absent.
pub fn repo_from_url(url: &str) -> String {
    PR_REPO
        .captures(url)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_default()
}

/// Jira issue keys mentioned in `text`, in order of appearance.
pub fn jira_keys(text: &str) -> Vec<String> {
    JIRA_KEY
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Row of `GitHub/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestSummary {
    pub number: Option<u64>,
    pub repo: String,
    pub title: String,
    pub author: String,
    pub author_name: String,
    pub team: String,
    pub merged_at: Option<String>,
    pub jira_keys: Vec<String>,
    pub url: String,
}

impl From<&PullRequest> for PullRequestSummary {
    fn from(pr: &PullRequest) -> Self {
        Self {
            number: pr.number,
            repo: pr.repo.clone(),
            title: pr.title.clone(),
            author: pr.author.clone(),
            author_name: pr.author_name.clone(),
            team: pr.team.clone(),
            merged_at: pr.merged_at.clone(),
            jira_keys: pr.jira_keys.clone(),
            url: pr.url.clone(),
        }
    }
}

/// Per-member row of `GitHub/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    pub github: String,
    pub name: String,
    pub team: String,
    pub pr_count: usize,
}
