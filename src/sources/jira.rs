// src/sources/jira.rs
//! Jira issue hierarchy snapshot.
//!
//! Starting from one or more root issues, children are fetched level by
//! level with JQL `parent in (...)` searches until a level comes back empty
//! or the depth limit is hit.

use crate::api::{collect_pages, ApiClient, Auth, Page, RateLimiter, RetryPolicy};
use crate::config::{JiraCredentials, JiraOptions};
use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, JIRA_CALLS_PER_SECOND, JIRA_EXCLUDED_ISSUE_TYPE, JIRA_INDEX_SUMMARY_CHARS,
    JIRA_INITIAL_RETRY_DELAY, JIRA_MAX_HIERARCHY_DEPTH, JIRA_PAGE_SIZE, JIRA_PARENT_BATCH_SIZE,
};
use crate::error::AppError;
use crate::model::{IndexEntry, JiraIssue, RawIssue, RawSearchPage};
use crate::output::OutputPlan;
use crate::pipeline::{iso_timestamp, JobReport, SnapshotJob, SyncContext};
use crate::state::SyncState;
use crate::types::{BaseUrl, IssueKey, KeyPrefix};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Status categories in the order INDEX.md lists them.
const STATUS_ORDER: [&str; 4] = ["To Do", "In Progress", "Done", "Unknown"];

pub struct JiraJob {
    client: ApiClient,
    limiter: RateLimiter,
    base_url: BaseUrl,
    options: JiraOptions,
}

/// Everything one Jira run produced.
#[derive(Debug, Clone)]
pub struct JiraSnapshot {
    pub root_keys: Vec<IssueKey>,
    pub filter: Option<KeyPrefix>,
    pub issues: Vec<JiraIssue>,
    pub levels: usize,
    pub filtered: usize,
    pub synced_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct IndexDocument<'a> {
    root_keys: &'a [IssueKey],
    total_issues: usize,
    synced_at: String,
    issues: Vec<IndexEntry>,
}

impl JiraJob {
    pub fn new(credentials: JiraCredentials, options: JiraOptions) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = ApiClient::new(
            Some(BaseUrl::parse(&credentials.base_url.join("rest/api/3"))?),
            Auth::Basic {
                user: credentials.email,
                token: credentials.token,
            },
            headers,
            RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, JIRA_INITIAL_RETRY_DELAY),
        )?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(JIRA_CALLS_PER_SECOND)?,
            base_url: credentials.base_url,
            options,
        })
    }

    /// Roots from the command line, else from the sync state.
    fn resolve_roots(&self, state: &SyncState) -> Result<Vec<IssueKey>, AppError> {
        if !self.options.roots.is_empty() {
            return Ok(self.options.roots.clone());
        }
        let configured = state
            .jira
            .as_ref()
            .map(|jira| jira.configured_roots())
            .unwrap_or_default();
        if configured.is_empty() {
            return Err(AppError::MissingConfiguration(
                "no root issue specified; pass --root ISSUE_KEY or set jira.root_issues in config.json"
                    .to_string(),
            ));
        }
        configured
            .iter()
            .map(|key| IssueKey::parse(key).map_err(AppError::from))
            .collect()
    }

    fn resolve_filter(&self, state: &SyncState) -> Result<Option<KeyPrefix>, AppError> {
        if let Some(filter) = &self.options.filter {
            return Ok(Some(filter.clone()));
        }
        state
            .jira
            .as_ref()
            .and_then(|jira| jira.filter_prefix.as_deref())
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| KeyPrefix::parse(prefix).map_err(AppError::from))
            .transpose()
    }

    /// Fetches one issue. Missing, forbidden and failing issues are logged
    /// and skipped.
    fn fetch_issue(&self, key: &IssueKey) -> Option<RawIssue> {
        let response = match self.client.get(&format!("issue/{}", key), &[], &self.limiter) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("    Error fetching {}: {}", key, e);
                return None;
            }
        };

        match response.status.as_u16() {
            200 => match response.json::<RawIssue>() {
                Ok(issue) => Some(issue),
                Err(e) => {
                    log::warn!("    Error fetching {}: {}", key, e);
                    None
                }
            },
            404 => {
                log::warn!("    Issue {} not found (404)", key);
                None
            }
            401 => {
                log::error!(
                    "    Authentication failed (401) - check JIRA_EMAIL and JIRA_API_TOKEN. Response: {}",
                    response.body_preview()
                );
                None
            }
            403 => {
                log::warn!(
                    "    Permission denied (403) - no access to {}. Response: {}",
                    key,
                    response.body_preview()
                );
                None
            }
            status => {
                log::warn!(
                    "    Error fetching {}: HTTP {}. Response: {}",
                    key,
                    status,
                    response.body_preview()
                );
                None
            }
        }
    }

    /// Fetches the children of every parent, batching parents per query.
    fn fetch_children(&self, parents: &[String], filter: Option<&KeyPrefix>) -> Vec<RawIssue> {
        let mut children = Vec::new();
        for batch in parents.chunks(JIRA_PARENT_BATCH_SIZE) {
            let jql = children_jql(batch, filter);
            let pages = collect_pages(
                |cursor| match self.search_page(&jql, cursor) {
                    Ok(page) => Ok(page),
                    Err(e) => {
                        // Keep the pages already collected for this batch.
                        log::warn!("    Error fetching children: {}", e);
                        Ok(Page::last(Vec::new()))
                    }
                },
                None,
            );
            if let Ok(result) = pages {
                children.extend(result.items);
            }
        }
        children
    }

    /// One `search/jql` page. A non-200 answer ends the batch with what
    /// was collected so far; callers treat errors the same way.
    fn search_page(&self, jql: &str, cursor: Option<&str>) -> Result<Page<RawIssue>, AppError> {
        let mut payload = json!({
            "jql": jql,
            "maxResults": JIRA_PAGE_SIZE,
            "fields": ["*all"],
        });
        if let Some(token) = cursor {
            payload["nextPageToken"] = json!(token);
        }

        let response = self.client.post_json("search/jql", &payload, &self.limiter)?;
        if !response.is_success() {
            log::warn!(
                "    Error in search: HTTP {}. Response: {}",
                response.status.as_u16(),
                response.body_preview()
            );
            return Ok(Page::last(Vec::new()));
        }

        let page: RawSearchPage = response.json()?;
        Ok(Page {
            items: page.issues,
            next_cursor: page.next_page_token,
        })
    }
}

impl SnapshotJob for JiraJob {
    type Snapshot = JiraSnapshot;

    fn name(&self) -> &'static str {
        "jira"
    }

    fn fetch(&self, ctx: &SyncContext) -> Result<JiraSnapshot, AppError> {
        let state = ctx.state();
        let root_keys = self.resolve_roots(&state)?;
        let filter = self.resolve_filter(&state)?;
        let base = self.base_url.as_str();

        log::info!(
            "  Root issues: {}",
            root_keys.iter().map(IssueKey::as_str).collect::<Vec<_>>().join(", ")
        );
        if let Some(prefix) = &filter {
            log::info!("  Filtering children by prefix: {}", prefix);
        }

        let mut issues = Vec::new();
        let mut current_keys = Vec::new();
        for root in &root_keys {
            match self.fetch_issue(root) {
                Some(raw) => {
                    issues.push(JiraIssue::from_raw(raw, 0, base));
                    current_keys.push(root.to_string());
                }
                None => log::warn!("    Root {} not found, skipping", root),
            }
        }
        if issues.is_empty() {
            return Err(AppError::SyncFailed("no root issues found".to_string()));
        }

        let mut level = 0;
        let mut filtered = 0;
        while !current_keys.is_empty() {
            level += 1;
            log::info!(
                "    Fetching level {} children of {} parents...",
                level,
                current_keys.len()
            );

            // The prefix filter only narrows the roots' direct children.
            let level_filter = if level == 1 { filter.as_ref() } else { None };
            let children = self.fetch_children(&current_keys, level_filter);
            if children.is_empty() {
                break;
            }
            log::info!("    Found {} issues at level {}", children.len(), level);

            let mut next_keys = Vec::new();
            for raw in children {
                let issue = JiraIssue::from_raw(raw, level, base);
                if issue.issue_type.name == JIRA_EXCLUDED_ISSUE_TYPE {
                    filtered += 1;
                    continue;
                }
                match &issue.key {
                    Some(key) => next_keys.push(key.clone()),
                    None => log::warn!(
                        "    Issue without key: {}",
                        issue.id.as_deref().unwrap_or("unknown")
                    ),
                }
                issues.push(issue);
            }
            current_keys = next_keys;

            if level >= JIRA_MAX_HIERARCHY_DEPTH {
                log::warn!("    Reached max depth of {} levels", JIRA_MAX_HIERARCHY_DEPTH);
                break;
            }
        }

        if filtered > 0 {
            log::info!("    Filtered out {} '{}' issues", filtered, JIRA_EXCLUDED_ISSUE_TYPE);
        }

        Ok(JiraSnapshot {
            root_keys,
            filter,
            issues,
            levels: level,
            filtered,
            synced_at: Utc::now(),
        })
    }

    fn compose(&self, snapshot: &JiraSnapshot, ctx: &SyncContext) -> Result<OutputPlan, AppError> {
        let dir = ctx.layout().jira_dir();
        let issues_dir = dir.join("issues");
        let synced_at = iso_timestamp(&snapshot.synced_at);

        let mut plan = OutputPlan::new().with_directory(&issues_dir);
        for issue in &snapshot.issues {
            // Keyless issues are listed in the index but get no file.
            if let Some(key) = &issue.key {
                plan = plan.with_json(issues_dir.join(format!("{}.json", key)), issue)?;
            }
        }

        let index = IndexDocument {
            root_keys: &snapshot.root_keys,
            total_issues: snapshot.issues.len(),
            synced_at: synced_at.clone(),
            issues: snapshot.issues.iter().map(IndexEntry::from).collect(),
        };
        let meta = json!({
            "root_keys": snapshot.root_keys,
            "last_synced": synced_at,
            "total_issues": snapshot.issues.len(),
            "jira_base_url": self.base_url.as_str(),
        });

        plan.with_file(
            dir.join("INDEX.md"),
            render_index(
                &snapshot.issues,
                &snapshot.root_keys,
                self.base_url.as_str(),
                &snapshot.synced_at,
            ),
        )
        .with_json(dir.join("index.json"), &index)?
        .with_json(dir.join("_meta.json"), &meta)
    }

    fn record(&self, snapshot: &JiraSnapshot, state: &mut SyncState) {
        let jira = state.jira_mut();
        let roots: Vec<String> = snapshot.root_keys.iter().map(IssueKey::to_string).collect();
        if let [single] = roots.as_slice() {
            jira.root_issue = Some(single.clone());
        }
        jira.root_issues = Some(roots);
        if let Some(prefix) = &snapshot.filter {
            jira.filter_prefix = Some(prefix.to_string());
        }
        jira.last_synced = Some(iso_timestamp(&snapshot.synced_at));
        jira.total_issues = Some(snapshot.issues.len());
    }

    fn report(&self, snapshot: &JiraSnapshot) -> JobReport {
        let mut report = JobReport::new(self.name(), snapshot.issues.len())
            .with_detail(format!("Hierarchy levels: {}", snapshot.levels));
        if snapshot.filtered > 0 {
            report = report.with_detail(format!(
                "{} excluded: {}",
                JIRA_EXCLUDED_ISSUE_TYPE, snapshot.filtered
            ));
        }
        report
    }
}

/// JQL selecting the children of `parents`, optionally narrowed to keys
/// starting with `prefix`.
pub fn children_jql(parents: &[String], prefix: Option<&KeyPrefix>) -> String {
    let parent_clause = parents.join(", ");
    match prefix {
        Some(prefix) => format!(
            "parent in ({}) AND key ~ '{}*' ORDER BY key ASC",
            parent_clause, prefix
        ),
        None => format!("parent in ({}) ORDER BY key ASC", parent_clause),
    }
}

fn level_name(level: usize) -> String {
    match level {
        0 => "Root".to_string(),
        1 => "Company Goals".to_string(),
        2 => "Team Goals".to_string(),
        3 => "Milestones/Epics".to_string(),
        n => format!("Level {}", n),
    }
}

/// Renders `Jira/INDEX.md`: issues grouped by level, then status category.
pub fn render_index(
    issues: &[JiraIssue],
    root_keys: &[IssueKey],
    base_url: &str,
    synced_at: &DateTime<Utc>,
) -> String {
    let root_links = root_keys
        .iter()
        .map(|key| format!("[{key}]({base_url}/browse/{key})"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        "# Jira Issue Hierarchy".to_string(),
        String::new(),
        format!("**Root Issues:** {}", root_links),
        format!("**Total Issues:** {}", issues.len()),
        format!("**Last Synced:** {}", synced_at.format("%Y-%m-%d %H:%M UTC")),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    let mut by_level: BTreeMap<usize, Vec<&JiraIssue>> = BTreeMap::new();
    for issue in issues {
        by_level.entry(issue.hierarchy_level).or_default().push(issue);
    }

    for (level, level_issues) in by_level {
        lines.push(format!("## {} ({} issues)", level_name(level), level_issues.len()));
        lines.push(String::new());

        let mut by_status: IndexMap<&str, Vec<&JiraIssue>> = STATUS_ORDER
            .iter()
            .map(|category| (*category, Vec::new()))
            .collect();
        for issue in level_issues {
            by_status
                .entry(issue.status.category.as_str())
                .or_default()
                .push(issue);
        }

        for (category, mut group) in by_status {
            if group.is_empty() {
                continue;
            }
            lines.push(format!("### {} ({})", category, group.len()));
            lines.push(String::new());

            group.sort_by(|a, b| a.key.as_deref().unwrap_or("").cmp(b.key.as_deref().unwrap_or("")));
            for issue in group {
                let key = issue.key.as_deref().unwrap_or("");
                let summary: String = issue.summary.chars().take(JIRA_INDEX_SUMMARY_CHARS).collect();
                let assignee = issue
                    .assignee
                    .as_ref()
                    .map(|a| a.name.as_str())
                    .unwrap_or("Unassigned");
                lines.push(format!("- [{key}]({base_url}/browse/{key}): {summary}"));
                lines.push(format!(
                    "  - Status: {} | Assignee: {}",
                    issue.status.name, assignee
                ));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
