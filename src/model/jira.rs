// src/model/jira.rs
//! Jira issue payloads and the flattened snapshot schema.
//!
//! `Raw*` types mirror the REST v3 response loosely: every field is optional
//! and nulls are accepted. [`JiraIssue::from_raw`] normalizes them into the
//! schema written to `Jira/issues/{KEY}.json`.

use crate::document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIssue {
    pub key: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Option<RawFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    pub summary: Option<String>,
    pub description: Option<Value>,
    pub project: Option<RawProject>,
    pub status: Option<RawStatus>,
    #[serde(rename = "issuetype")]
    pub issue_type: Option<RawIssueType>,
    pub priority: Option<RawNamed>,
    pub assignee: Option<RawUser>,
    pub reporter: Option<RawUser>,
    pub created: Option<String>,
    pub updated: Option<String>,
    #[serde(rename = "resolutiondate")]
    pub resolution_date: Option<String>,
    pub parent: Option<RawIssueRef>,
    pub labels: Option<Vec<String>>,
    #[serde(rename = "issuelinks")]
    pub issue_links: Option<Vec<RawLink>>,
    pub comment: Option<RawCommentPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProject {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNamed {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    pub name: Option<String>,
    pub status_category: Option<RawNamed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIssueType {
    pub name: Option<String>,
    pub subtask: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

/// A reference to another issue with its summary (parent, link target).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIssueRef {
    pub key: Option<String>,
    pub fields: Option<RawRefFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRefFields {
    pub summary: Option<String>,
}

impl RawIssueRef {
    fn summary(&self) -> String {
        self.fields
            .as_ref()
            .and_then(|f| f.summary.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLink {
    #[serde(rename = "type")]
    pub link_type: Option<RawLinkType>,
    pub outward_issue: Option<RawIssueRef>,
    pub inward_issue: Option<RawIssueRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLinkType {
    pub name: Option<String>,
    pub inward: Option<String>,
    pub outward: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommentPage {
    pub comments: Option<Vec<RawComment>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComment {
    pub id: Option<String>,
    pub author: Option<RawUser>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub body: Option<Value>,
}

/// One page of `POST search/jql` results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchPage {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    pub next_page_token: Option<String>,
}

// --- Snapshot schema ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: Option<String>,
    pub id: Option<String>,
    pub hierarchy_level: usize,
    pub project: String,
    pub summary: String,
    pub description_text: String,
    pub status: StatusInfo,
    pub issue_type: IssueTypeInfo,
    pub priority: Option<String>,
    pub assignee: Option<Assignee>,
    pub reporter: Option<Reporter>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub resolved: Option<String>,
    pub parent: Option<ParentInfo>,
    pub labels: Vec<String>,
    pub links: Vec<IssueLink>,
    pub comments: Vec<Comment>,
    pub jira_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTypeInfo {
    pub name: String,
    pub subtask: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub account_id: Option<String>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    pub account_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentInfo {
    pub key: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub direction: String,
    pub key: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<String>,
    pub author: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub body: String,
}

impl JiraIssue {
    /// Normalizes a raw issue found at `hierarchy_level` (0 for roots).
    pub fn from_raw(raw: RawIssue, hierarchy_level: usize, base_url: &str) -> Self {
        let fields = raw.fields.unwrap_or_default();

        let status = fields.status.unwrap_or_default();
        let issue_type = fields.issue_type.unwrap_or_default();

        let comments = fields
            .comment
            .and_then(|page| page.comments)
            .unwrap_or_default()
            .into_iter()
            .map(|comment| Comment {
                id: comment.id,
                author: comment
                    .author
                    .and_then(|a| a.display_name)
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                created: comment.created,
                updated: comment.updated,
                body: document::convert(comment.body.as_ref()),
            })
            .collect();

        let links = fields
            .issue_links
            .unwrap_or_default()
            .into_iter()
            .filter_map(parse_link)
            .collect();

        let key = raw.key;
        let jira_url = format!("{}/browse/{}", base_url, key.as_deref().unwrap_or_default());

        Self {
            key,
            id: raw.id,
            hierarchy_level,
            project: fields.project.and_then(|p| p.key).unwrap_or_default(),
            summary: fields.summary.unwrap_or_default(),
            description_text: document::convert(fields.description.as_ref()),
            status: StatusInfo {
                name: status.name.unwrap_or_else(|| UNKNOWN.to_string()),
                category: status
                    .status_category
                    .and_then(|c| c.name)
                    .unwrap_or_else(|| UNKNOWN.to_string()),
            },
            issue_type: IssueTypeInfo {
                name: issue_type.name.unwrap_or_else(|| UNKNOWN.to_string()),
                subtask: issue_type.subtask.unwrap_or(false),
            },
            priority: fields.priority.and_then(|p| p.name),
            assignee: fields.assignee.map(|user| Assignee {
                account_id: user.account_id,
                name: user.display_name.unwrap_or_else(|| UNKNOWN.to_string()),
                email: user.email_address.unwrap_or_default(),
            }),
            reporter: fields.reporter.map(|user| Reporter {
                account_id: user.account_id,
                name: user.display_name.unwrap_or_else(|| UNKNOWN.to_string()),
            }),
            created: fields.created,
            updated: fields.updated,
            resolved: fields.resolution_date,
            parent: fields.parent.map(|parent| ParentInfo {
                summary: parent.summary(),
                key: parent.key,
            }),
            labels: fields.labels.unwrap_or_default(),
            links,
            comments,
            jira_url,
        }
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent.as_ref().and_then(|p| p.key.as_deref())
    }
}

/// Outward links take precedence; links with neither side are dropped.
fn parse_link(link: RawLink) -> Option<IssueLink> {
    let link_type = link.link_type.unwrap_or_default();
    let (linked, direction) = match (link.outward_issue, link.inward_issue) {
        (Some(outward), _) => (outward, link_type.outward),
        (None, Some(inward)) => (inward, link_type.inward),
        (None, None) => return None,
    };
    Some(IssueLink {
        link_type: link_type.name.unwrap_or_default(),
        direction: direction.unwrap_or_else(|| "relates to".to_string()),
        summary: linked.summary(),
        key: linked.key,
    })
}

/// Row of `Jira/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub key: Option<String>,
    pub summary: String,
    pub level: usize,
    pub status: String,
    pub status_category: String,
    pub parent: Option<String>,
}

impl From<&JiraIssue> for IndexEntry {
    fn from(issue: &JiraIssue) -> Self {
        Self {
            key: issue.key.clone(),
            summary: issue.summary.clone(),
            level: issue.hierarchy_level,
            status: issue.status.name.clone(),
            status_category: issue.status.category.clone(),
            parent: issue.parent_key().map(str::to_string),
        }
    }
}
