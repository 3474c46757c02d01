// tests/integration/jira_sync.rs
//! Jira hierarchy sync end to end

use crate::common::{read_json, read_state, workspace_with_state};
use context_sync::config::{JiraCredentials, JiraOptions};
use context_sync::{
    run_job, AppError, ApiToken, BaseUrl, IssueKey, JiraJob, JobReport, KeyPrefix, SyncContext,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_jira(ctx: Arc<SyncContext>, base: String, options: JiraOptions) -> Result<JobReport, AppError> {
    tokio::task::spawn_blocking(move || -> Result<JobReport, AppError> {
        let credentials = JiraCredentials {
            email: "vader@empire.test".to_string(),
            token: ApiToken::new("secret")?,
            base_url: BaseUrl::parse(&base)?,
        };
        let job = JiraJob::new(credentials, options)?;
        run_job(&job, &ctx)
    })
    .await
    .expect("jira job should not panic")
}

fn issue(key: &str, summary: &str, status: &str, category: &str, issue_type: &str, parent: Option<&str>) -> Value {
    let mut fields = json!({
        "summary": summary,
        "project": {"key": key.split('-').next().unwrap()},
        "status": {"name": status, "statusCategory": {"name": category}},
        "issuetype": {"name": issue_type, "subtask": false},
        "labels": [],
    });
    if let Some(parent) = parent {
        fields["parent"] = json!({"key": parent, "fields": {"summary": "parent"}});
    }
    json!({"key": key, "id": "10001", "fields": fields})
}

/// Answers every search that no more specific mock claimed with no issues.
async fn mount_empty_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issues": []})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn syncs_hierarchy_from_configured_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/EMP-1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(
            "EMP-1", "Rebuild the station", "In Progress", "In Progress", "Initiative", None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    // Second page first: it is the more specific match.
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({"nextPageToken": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue("EMP-3", "Shield generator", "Done", "Done", "Epic", Some("EMP-1"))]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({
            "jql": "parent in (EMP-1) ORDER BY key ASC",
            "maxResults": 100,
            "fields": ["*all"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [
                issue("EMP-2", "Superlaser", "To Do", "To Do", "Epic", Some("EMP-1")),
                issue("EMP-9", "Sizing", "To Do", "To Do", "Effort Estimate", Some("EMP-1"))
            ],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_empty_search(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"jira": {"root_issues": ["EMP-1"], "owner": "vader"}}),
    ));

    let report = run_jira(ctx, server.uri(), JiraOptions::default()).await.unwrap();
    assert_eq!(report.items, 3);
    assert!(report.details.iter().any(|d| d == "Effort Estimate excluded: 1"));

    let jira_dir = dir.path().join("Synced-Data/Jira");
    for key in ["EMP-1", "EMP-2", "EMP-3"] {
        assert!(jira_dir.join(format!("issues/{key}.json")).exists(), "{key} should be written");
    }
    assert!(!jira_dir.join("issues/EMP-9.json").exists());

    let child = read_json(&jira_dir.join("issues/EMP-2.json"));
    assert_eq!(child["hierarchy_level"], 1);
    assert_eq!(child["parent"]["key"], "EMP-1");
    assert_eq!(child["jira_url"], format!("{}/browse/EMP-2", server.uri()));

    let index = read_json(&jira_dir.join("index.json"));
    assert_eq!(index["total_issues"], 3);
    assert_eq!(index["root_keys"], json!(["EMP-1"]));
    assert_eq!(index["issues"][0]["key"], "EMP-1");

    let meta = read_json(&jira_dir.join("_meta.json"));
    assert_eq!(meta["jira_base_url"], server.uri());

    let markdown = std::fs::read_to_string(jira_dir.join("INDEX.md")).unwrap();
    assert!(markdown.contains("EMP-3"));
    assert!(!markdown.contains("EMP-9"));

    let state = read_state(dir.path());
    assert_eq!(state["jira"]["root_issue"], "EMP-1");
    assert_eq!(state["jira"]["total_issues"], 3);
    assert_eq!(state["jira"]["owner"], "vader");
    assert!(state["jira"]["last_synced"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn broken_search_page_keeps_children_already_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/EMP-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(
            "EMP-1", "Rebuild the station", "In Progress", "In Progress", "Initiative", None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({"nextPageToken": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({"jql": "parent in (EMP-1) ORDER BY key ASC"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue("EMP-2", "Superlaser", "To Do", "To Do", "Epic", Some("EMP-1"))],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_empty_search(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({"jira": {"root_issue": "EMP-1"}})));

    let report = run_jira(ctx, server.uri(), JiraOptions::default()).await.unwrap();
    assert_eq!(report.items, 2);

    let jira_dir = dir.path().join("Synced-Data/Jira");
    assert!(jira_dir.join("issues/EMP-2.json").exists());
    assert_eq!(read_state(dir.path())["jira"]["total_issues"], 2);
}

#[tokio::test]
async fn prefix_filter_applies_to_first_level_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/EMP-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(
            "EMP-1", "Root", "To Do", "To Do", "Initiative", None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({
            "jql": "parent in (EMP-1) AND key ~ 'NAVY-*' ORDER BY key ASC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue("NAVY-4", "Fleet goal", "To Do", "To Do", "Goal", Some("EMP-1"))]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({"jql": "parent in (NAVY-4) ORDER BY key ASC"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue("ARMY-2", "Ground support", "Done", "Done", "Epic", Some("NAVY-4"))]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_empty_search(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({})));
    let options = JiraOptions {
        roots: vec![IssueKey::parse("emp-1").unwrap()],
        filter: Some(KeyPrefix::parse("navy-").unwrap()),
        full: false,
    };

    let report = run_jira(ctx, server.uri(), options).await.unwrap();
    assert_eq!(report.items, 3);

    let state = read_state(dir.path());
    assert_eq!(state["jira"]["filter_prefix"], "NAVY-");
    assert_eq!(state["jira"]["root_issues"], json!(["EMP-1"]));
}

#[tokio::test]
async fn missing_roots_fail_without_touching_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/EMP-404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"errorMessages\":[\"gone\"]}"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({"jira": {"root_issue": "EMP-404"}})));

    let err = run_jira(ctx, server.uri(), JiraOptions::default()).await.unwrap_err();
    assert!(matches!(err, AppError::SyncFailed(_)));
    assert!(!dir.path().join("Synced-Data/Jira").exists());
    assert_eq!(read_state(dir.path()), json!({"jira": {"root_issue": "EMP-404"}}));
}

#[tokio::test]
async fn no_roots_anywhere_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({})));
    let err = run_jira(ctx, "http://127.0.0.1:9".to_string(), JiraOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MissingConfiguration(_)));
}
