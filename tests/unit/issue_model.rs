// tests/unit/issue_model.rs
//! Normalization of raw Jira payloads into the snapshot schema

use context_sync::model::{IndexEntry, JiraIssue, RawIssue};
use pretty_assertions::assert_eq;
use serde_json::json;

const BASE: &str = "https://empire.atlassian.net";

fn raw(value: serde_json::Value) -> RawIssue {
    serde_json::from_value(value).expect("fixture should deserialize")
}

#[test]
fn full_issue_is_flattened() {
    let issue = JiraIssue::from_raw(
        raw(json!({
            "key": "EMP-7",
            "id": "10007",
            "fields": {
                "summary": "Finish the second station",
                "project": {"key": "EMP"},
                "status": {"name": "In Progress", "statusCategory": {"name": "In Progress"}},
                "issuetype": {"name": "Epic", "subtask": false},
                "priority": {"name": "Highest"},
                "assignee": {"accountId": "a1", "displayName": "Moff Jerjerrod", "emailAddress": "moff@empire.test"},
                "reporter": {"accountId": "a2", "displayName": "Darth Vader"},
                "created": "2025-07-01T10:00:00.000+0000",
                "updated": "2025-07-20T10:00:00.000+0000",
                "resolutiondate": null,
                "parent": {"key": "EMP-1", "fields": {"summary": "Rebuild"}},
                "labels": ["station", "priority"],
                "issuelinks": [
                    {"type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                     "outwardIssue": {"key": "EMP-9", "fields": {"summary": "Shield generator"}}},
                    {"type": {"name": "Relates", "inward": "relates to", "outward": "relates to"},
                     "inwardIssue": {"key": "EMP-3", "fields": {"summary": "Budget"}}},
                    {"type": {"name": "Dangling"}}
                ],
                "description": {"type": "doc", "version": 1, "content": [
                    {"type": "paragraph", "content": [
                        {"type": "text", "text": "Deadline is "},
                        {"type": "text", "text": "firm", "marks": [{"type": "strong"}]}
                    ]}
                ]},
                "comment": {"comments": [
                    {"id": "c1", "author": {"displayName": "Palpatine"}, "created": "2025-07-02T00:00:00.000+0000",
                     "body": {"type": "doc", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Increase the pace."}]}]}},
                    {"id": "c2", "author": null, "body": null}
                ]}
            }
        })),
        1,
        BASE,
    );

    assert_eq!(issue.key.as_deref(), Some("EMP-7"));
    assert_eq!(issue.hierarchy_level, 1);
    assert_eq!(issue.project, "EMP");
    assert_eq!(issue.description_text, "Deadline is **firm**");
    assert_eq!(issue.status.category, "In Progress");
    assert_eq!(issue.priority.as_deref(), Some("Highest"));
    assert_eq!(issue.assignee.as_ref().map(|a| a.email.as_str()), Some("moff@empire.test"));
    assert_eq!(issue.parent_key(), Some("EMP-1"));
    assert_eq!(issue.resolved, None);
    assert_eq!(issue.jira_url, "https://empire.atlassian.net/browse/EMP-7");

    assert_eq!(issue.links.len(), 2);
    assert_eq!(issue.links[0].direction, "blocks");
    assert_eq!(issue.links[0].key.as_deref(), Some("EMP-9"));
    assert_eq!(issue.links[1].direction, "relates to");
    assert_eq!(issue.links[1].summary, "Budget");

    assert_eq!(issue.comments.len(), 2);
    assert_eq!(issue.comments[0].body, "Increase the pace.");
    assert_eq!(issue.comments[1].author, "Unknown");
    assert_eq!(issue.comments[1].body, "");
}

#[test]
fn sparse_issue_gets_placeholders() {
    let issue = JiraIssue::from_raw(raw(json!({"key": "EMP-2", "fields": null})), 0, BASE);

    assert_eq!(issue.summary, "");
    assert_eq!(issue.status.name, "Unknown");
    assert_eq!(issue.status.category, "Unknown");
    assert_eq!(issue.issue_type.name, "Unknown");
    assert!(!issue.issue_type.subtask);
    assert!(issue.assignee.is_none());
    assert!(issue.labels.is_empty());
    assert_eq!(issue.description_text, "");
}

#[test]
fn index_entry_mirrors_issue() {
    let issue = JiraIssue::from_raw(
        raw(json!({
            "key": "EMP-8",
            "fields": {
                "summary": "Train gunners",
                "status": {"name": "Done", "statusCategory": {"name": "Done"}},
                "parent": {"key": "EMP-7"}
            }
        })),
        2,
        BASE,
    );
    let entry = IndexEntry::from(&issue);
    assert_eq!(
        serde_json::to_value(&entry).unwrap(),
        json!({
            "key": "EMP-8",
            "summary": "Train gunners",
            "level": 2,
            "status": "Done",
            "status_category": "Done",
            "parent": "EMP-7"
        })
    );
}
