// src/sources/github.rs
//! Merged pull requests authored by team members.
//!
//! Team membership comes from the curated `Teams/{team}.md` stubs and each
//! member's GitHub handle from the `github` key in their person stub's
//! front-matter.

use crate::api::{collect_pages, ApiClient, Auth, Page, RateLimiter, RetryPolicy};
use crate::config::{GithubCredentials, GithubOptions};
use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, GITHUB_API_BASE, GITHUB_API_VERSION, GITHUB_CALLS_PER_SECOND,
    GITHUB_DEFAULT_LOOKBACK_DAYS, GITHUB_DEFAULT_ORG, GITHUB_INITIAL_RETRY_DELAY, GITHUB_PAGE_SIZE,
};
use crate::error::AppError;
use crate::model::{MemberSummary, PullRequest, PullRequestSummary, SearchItem, SearchPage};
use crate::output::{DataLayout, OutputPlan};
use crate::pipeline::{iso_timestamp, JobReport, SnapshotJob, SyncContext};
use crate::state::SyncState;
use crate::types::BaseUrl;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)").expect("wikilink regex is valid"));

pub struct GithubJob {
    client: ApiClient,
    limiter: RateLimiter,
    options: GithubOptions,
}

/// A team member with a resolved GitHub handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub github: String,
    pub team: String,
}

#[derive(Debug, Clone)]
pub struct GithubSnapshot {
    pub org: String,
    pub teams: Vec<String>,
    pub lookback_days: u32,
    pub cutoff_date: String,
    pub members: Vec<MemberSummary>,
    pub members_skipped: usize,
    pub pull_requests: Vec<PullRequest>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct IndexDocument<'a> {
    org: &'a str,
    synced_at: String,
    lookback_days: u32,
    total_prs: usize,
    members: &'a [MemberSummary],
    pull_requests: Vec<PullRequestSummary>,
}

impl GithubJob {
    pub fn new(credentials: GithubCredentials, options: GithubOptions) -> Result<Self, AppError> {
        Self::with_api_base(credentials, options, BaseUrl::parse(GITHUB_API_BASE)?)
    }

    /// Like [`GithubJob::new`] against another API root (GitHub Enterprise).
    pub fn with_api_base(
        credentials: GithubCredentials,
        options: GithubOptions,
        api_base: BaseUrl,
    ) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = ApiClient::new(
            Some(api_base),
            Auth::Bearer(credentials.token),
            headers,
            RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, GITHUB_INITIAL_RETRY_DELAY),
        )?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(GITHUB_CALLS_PER_SECOND)?,
            options,
        })
    }

    /// All merged PRs by `handle` in `org` since `cutoff_date` (`YYYY-MM-DD`).
    pub fn fetch_merged_prs(
        &self,
        org: &str,
        handle: &str,
        cutoff_date: &str,
    ) -> Result<Vec<SearchItem>, AppError> {
        let query = format!(
            "is:pr is:merged org:{} author:{} merged:>={}",
            org, handle, cutoff_date
        );
        let mut collected = 0u64;

        let result = collect_pages(
            |cursor| {
                let page_number: u32 = cursor.and_then(|c| c.parse().ok()).unwrap_or(1);
                let page = self.search_page(&query, page_number)?;
                let received = page.items.len();
                collected += received as u64;

                let next_cursor = if collected >= page.total_count || received < GITHUB_PAGE_SIZE {
                    None
                } else {
                    Some((page_number + 1).to_string())
                };
                Ok(Page {
                    items: page.items,
                    next_cursor,
                })
            },
            None,
        )?;

        log::debug!(
            "    {}: {} items over {} pages",
            handle,
            result.items.len(),
            result.pages_fetched
        );
        Ok(result.items)
    }

    /// One search page. Rejected queries and error statuses come back as an
    /// empty page.
    fn search_page(&self, query: &str, page: u32) -> Result<SearchPage, AppError> {
        let params = [
            ("q", query.to_string()),
            ("per_page", GITHUB_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        let response = self.client.get("search/issues", &params, &self.limiter)?;

        match response.status.as_u16() {
            200 => response.json(),
            422 => {
                log::warn!("    Search query validation failed (422)");
                log::debug!("    Response: {}", response.body_preview());
                Ok(SearchPage::default())
            }
            status => {
                log::warn!("    GitHub API returned {}", status);
                log::debug!("    Response: {}", response.body_preview());
                Ok(SearchPage::default())
            }
        }
    }

    fn resolve_teams(&self, state: &SyncState) -> Result<Vec<String>, AppError> {
        let configured = state
            .github
            .as_ref()
            .and_then(|github| github.teams.clone())
            .unwrap_or_default();

        let teams = match &self.options.team {
            Some(team) => {
                if !configured.contains(team) {
                    log::warn!("Team '{}' not in config, proceeding anyway", team);
                }
                vec![team.clone()]
            }
            None => configured,
        };

        if teams.is_empty() {
            return Err(AppError::MissingConfiguration(
                "no teams configured; set github.teams in config.json".to_string(),
            ));
        }
        Ok(teams)
    }
}

impl SnapshotJob for GithubJob {
    type Snapshot = GithubSnapshot;

    fn name(&self) -> &'static str {
        "github"
    }

    fn fetch(&self, ctx: &SyncContext) -> Result<GithubSnapshot, AppError> {
        let state = ctx.state();
        let github_state = state.github.clone().unwrap_or_default();
        let org = github_state
            .org
            .clone()
            .unwrap_or_else(|| GITHUB_DEFAULT_ORG.to_string());
        let teams = self.resolve_teams(&state)?;
        let lookback_days = self
            .options
            .lookback_days
            .or(github_state.lookback_days)
            .unwrap_or(GITHUB_DEFAULT_LOOKBACK_DAYS);

        let now = Utc::now();
        let cutoff_date = (now - Duration::days(i64::from(lookback_days)))
            .format("%Y-%m-%d")
            .to_string();

        log::info!("  Org: {}", org);
        log::info!("  Teams: {}", teams.join(", "));
        log::info!("  Lookback: {} days (since {})", lookback_days, cutoff_date);

        let (members, skipped) = resolve_members(ctx.layout(), &teams);
        log::info!(
            "  Members found: {} ({} skipped - no GitHub handle)",
            members.len(),
            skipped
        );
        if members.is_empty() {
            return Err(AppError::MissingConfiguration(
                "no team members with GitHub handles found".to_string(),
            ));
        }

        let mut pull_requests = Vec::new();
        let mut summaries = Vec::new();
        for member in &members {
            let items = self.fetch_merged_prs(&org, &member.github, &cutoff_date)?;
            log::info!("  Fetching PRs for {}... {} PRs", member.github, items.len());

            summaries.push(MemberSummary {
                github: member.github.clone(),
                name: member.name.clone(),
                team: member.team.clone(),
                pr_count: items.len(),
            });
            pull_requests.extend(
                items
                    .into_iter()
                    .map(|item| PullRequest::from_search_item(item, &member.name, &member.team)),
            );
        }
        log::info!("  Total PRs: {}", pull_requests.len());

        Ok(GithubSnapshot {
            org,
            teams,
            lookback_days,
            cutoff_date,
            members: summaries,
            members_skipped: skipped,
            pull_requests,
            synced_at: now,
        })
    }

    fn compose(&self, snapshot: &GithubSnapshot, ctx: &SyncContext) -> Result<OutputPlan, AppError> {
        let dir = ctx.layout().github_dir();
        let pr_dir = dir.join("pull-requests");
        let synced_at = iso_timestamp(&snapshot.synced_at);

        let meta = json!({
            "org": snapshot.org,
            "teams": snapshot.teams,
            "lookback_days": snapshot.lookback_days,
            "last_synced": synced_at,
            "total_prs": snapshot.pull_requests.len(),
            "members_synced": snapshot.members.len(),
            "members_skipped": snapshot.members_skipped,
        });

        let mut newest_first: Vec<&PullRequest> = snapshot.pull_requests.iter().collect();
        newest_first.sort_by(|a, b| b.merged_sort_key().cmp(a.merged_sort_key()));
        let index = IndexDocument {
            org: &snapshot.org,
            synced_at: synced_at.clone(),
            lookback_days: snapshot.lookback_days,
            total_prs: snapshot.pull_requests.len(),
            members: &snapshot.members,
            pull_requests: newest_first.into_iter().map(PullRequestSummary::from).collect(),
        };

        let mut plan = OutputPlan::new()
            .with_directory(&pr_dir)
            .with_json(dir.join("_meta.json"), &meta)?
            .with_json(dir.join("index.json"), &index)?
            .with_file(dir.join("INDEX.md"), render_index(snapshot));
        for pr in &snapshot.pull_requests {
            plan = plan.with_json(pr_dir.join(pr.file_name()), pr)?;
        }
        Ok(plan)
    }

    fn record(&self, snapshot: &GithubSnapshot, state: &mut SyncState) {
        let github = state.github_mut();
        github.last_synced = Some(iso_timestamp(&snapshot.synced_at));
        github.total_prs = Some(snapshot.pull_requests.len());
    }

    fn report(&self, snapshot: &GithubSnapshot) -> JobReport {
        JobReport::new(self.name(), snapshot.pull_requests.len()).with_detail(format!(
            "{} members synced, {} skipped",
            snapshot.members.len(),
            snapshot.members_skipped
        ))
    }
}

/// Member names listed as wikilinks (`[[Name]]` or `[[Name|Alias]]`) in
/// the `## Members` section of a team stub.
pub fn parse_team_members(content: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut in_members = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("## Members") {
            in_members = true;
            continue;
        }
        if !in_members {
            continue;
        }
        if trimmed.starts_with("## ") {
            break;
        }
        if let Some(caps) = WIKILINK.captures(line) {
            members.push(caps[1].trim().to_string());
        }
    }
    members
}

/// YAML front-matter between the leading `---` fences. Text without
/// front-matter yields an empty mapping.
pub fn parse_front_matter(text: &str) -> Result<serde_yaml::Mapping, serde_yaml::Error> {
    let text = text.trim();
    if !text.starts_with("---") {
        return Ok(serde_yaml::Mapping::new());
    }
    let mut parts = text.splitn(3, "---");
    let (Some(_), Some(yaml), Some(_)) = (parts.next(), parts.next(), parts.next()) else {
        return Ok(serde_yaml::Mapping::new());
    };

    match serde_yaml::from_str::<serde_yaml::Value>(yaml)? {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        _ => Ok(serde_yaml::Mapping::new()),
    }
}

/// The `github` handle from a person stub, if any.
fn resolve_handle(path: &Path) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            log::warn!("    Person stub not found: {}", path.display());
            return None;
        }
    };

    let front_matter = match parse_front_matter(&content) {
        Ok(mapping) => mapping,
        Err(source) => {
            let err = AppError::FrontMatter {
                path: path.to_path_buf(),
                source,
            };
            log::warn!("    {}", err);
            return None;
        }
    };

    front_matter
        .get("github")
        .and_then(serde_yaml::Value::as_str)
        .map(str::trim)
        .filter(|handle| !handle.is_empty())
        .map(str::to_string)
}

/// Members with handles for every team, plus the count of members skipped
/// for lack of one.
pub fn resolve_members(layout: &DataLayout, teams: &[String]) -> (Vec<Member>, usize) {
    let mut members = Vec::new();
    let mut skipped = 0;

    for team in teams {
        let team_file = layout.team_stub(team);
        let content = match fs::read_to_string(&team_file) {
            Ok(content) => content,
            Err(_) => {
                log::warn!("  Team stub not found: {}", team_file.display());
                continue;
            }
        };

        for name in parse_team_members(&content) {
            match resolve_handle(&layout.person_stub(&name)) {
                Some(github) => members.push(Member {
                    name,
                    github,
                    team: team.clone(),
                }),
                None => {
                    log::info!("    SKIPPED: {} (no GitHub handle in stub)", name);
                    skipped += 1;
                }
            }
        }
    }
    (members, skipped)
}

/// Renders `GitHub/INDEX.md`: teams, then authors, then PRs newest first.
pub fn render_index(snapshot: &GithubSnapshot) -> String {
    let today = snapshot.synced_at.format("%Y-%m-%d");
    let mut lines = vec![
        "# GitHub Activity Summary".to_string(),
        format!("**Org:** {}", snapshot.org),
        format!(
            "**Period:** {} to {} ({} days)",
            snapshot.cutoff_date, today, snapshot.lookback_days
        ),
        format!("**Last synced:** {}", iso_timestamp(&snapshot.synced_at)),
        format!(
            "**Total PRs merged:** {} across {} members",
            snapshot.pull_requests.len(),
            snapshot.members.len()
        ),
        String::new(),
    ];

    let mut by_team: BTreeMap<&str, Vec<&PullRequest>> = snapshot
        .teams
        .iter()
        .map(|team| (team.as_str(), Vec::new()))
        .collect();
    for pr in &snapshot.pull_requests {
        by_team.entry(pr.team.as_str()).or_default().push(pr);
    }

    for (team, team_prs) in by_team {
        lines.push(format!("## {} ({} PRs)", team, team_prs.len()));
        lines.push(String::new());

        let mut by_author: BTreeMap<&str, Vec<&PullRequest>> = BTreeMap::new();
        for pr in team_prs {
            by_author.entry(pr.author_name.as_str()).or_default().push(pr);
        }

        for (author, mut prs) in by_author {
            lines.push(format!(
                "### {} ({}) \u{2014} {} PRs",
                author,
                prs[0].author,
                prs.len()
            ));

            prs.sort_by(|a, b| b.merged_sort_key().cmp(a.merged_sort_key()));
            for pr in prs {
                let merged_date: String = pr.merged_sort_key().chars().take(10).collect();
                let number = pr.number.map(|n| n.to_string()).unwrap_or_default();
                let jira_tag = if pr.jira_keys.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", pr.jira_keys.join(", "))
                };
                lines.push(format!(
                    "- [{}#{}]({}): {} (merged {}){}",
                    pr.repo_short(),
                    number,
                    pr.url,
                    pr.title,
                    merged_date,
                    jira_tag
                ));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
