// tests/integration/github_sync.rs
//! Merged pull request sync from curated team stubs

use crate::common::{read_json, read_state, workspace_with_state};
use context_sync::config::{GithubCredentials, GithubOptions};
use context_sync::{run_job, AppError, ApiToken, BaseUrl, GithubJob, JobReport, SyncContext};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_github(ctx: Arc<SyncContext>, base: String, options: GithubOptions) -> Result<JobReport, AppError> {
    tokio::task::spawn_blocking(move || -> Result<JobReport, AppError> {
        let credentials = GithubCredentials {
            token: ApiToken::new("ghp_imperial")?,
        };
        let job = GithubJob::with_api_base(credentials, options, BaseUrl::parse(&base)?)?;
        run_job(&job, &ctx)
    })
    .await
    .expect("github job should not panic")
}

fn write_stub(root: &Path, relative: &str, content: &str) {
    let path = root.join("Curated-Context").join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn curated_navy(root: &Path) {
    write_stub(
        root,
        "Teams/Imperial Navy.md",
        "# Imperial Navy\n\n## Members\n- [[Darth Vader]]\n- [[Firmus Piett|Admiral Piett]]\n\n## Projects\n- [[Death Star]]\n",
    );
    write_stub(
        root,
        "People/Darth Vader.md",
        "---\nrole: Supreme Commander\ngithub: lordvader\n---\n\n# Darth Vader\n",
    );
    write_stub(root, "People/Firmus Piett.md", "---\nrole: Admiral\n---\n");
}

#[tokio::test]
async fn syncs_merged_prs_for_team_members() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(header("authorization", "Bearer ghp_imperial"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "items": [
                {
                    "number": 42,
                    "title": "EMP-7 Add exhaust port cover",
                    "html_url": "https://github.com/galactic-empire/Death-Star/pull/42",
                    "user": {"login": "lordvader"},
                    "created_at": "2025-07-18T09:00:00Z",
                    "pull_request": {"merged_at": "2025-07-19T12:00:00Z"},
                    "labels": [{"name": "security"}],
                    "comments": 3
                },
                {
                    "number": 7,
                    "title": "Tune superlaser",
                    "html_url": "https://github.com/galactic-empire/superlaser/pull/7",
                    "user": {"login": "lordvader"},
                    "created_at": "2025-07-20T09:00:00Z",
                    "pull_request": {"merged_at": "2025-07-21T08:30:00Z"}
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    curated_navy(dir.path());
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"github": {"org": "galactic-empire", "teams": ["Imperial Navy"], "lookback_days": 14}}),
    ));

    let report = run_github(ctx, server.uri(), GithubOptions::default()).await.unwrap();
    assert_eq!(report.items, 2);
    assert_eq!(report.details, vec!["1 members synced, 1 skipped".to_string()]);

    let requests = server.received_requests().await.unwrap();
    let query = requests[0]
        .url
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert!(query.starts_with("is:pr is:merged org:galactic-empire author:lordvader merged:>="));

    let github_dir = dir.path().join("Synced-Data/GitHub");
    let pr = read_json(&github_dir.join("pull-requests/galactic-empire_death-star_42.json"));
    assert_eq!(pr["repo"], "galactic-empire/death-star");
    assert_eq!(pr["author_name"], "Darth Vader");
    assert_eq!(pr["team"], "Imperial Navy");
    assert_eq!(pr["jira_keys"], json!(["EMP-7"]));
    assert_eq!(pr["labels"], json!(["security"]));
    assert!(github_dir.join("pull-requests/galactic-empire_superlaser_7.json").exists());

    let index = read_json(&github_dir.join("index.json"));
    assert_eq!(index["total_prs"], 2);
    assert_eq!(index["pull_requests"][0]["number"], 7);
    assert_eq!(index["members"][0]["pr_count"], 2);

    let meta = read_json(&github_dir.join("_meta.json"));
    assert_eq!(meta["members_synced"], 1);
    assert_eq!(meta["members_skipped"], 1);

    let markdown = std::fs::read_to_string(github_dir.join("INDEX.md")).unwrap();
    assert!(markdown.contains("## Imperial Navy"));
    assert!(markdown.contains("### Darth Vader (lordvader) \u{2014} 2 PRs"));

    let state = read_state(dir.path());
    assert_eq!(state["github"]["total_prs"], 2);
    assert_eq!(state["github"]["teams"], json!(["Imperial Navy"]));
}

#[tokio::test]
async fn rejected_search_counts_as_no_prs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "Validation Failed"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    curated_navy(dir.path());
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({"github": {"teams": ["Imperial Navy"]}})));

    let report = run_github(ctx, server.uri(), GithubOptions::default()).await.unwrap();
    assert_eq!(report.items, 0);
    assert!(dir.path().join("Synced-Data/GitHub/pull-requests").is_dir());
}

#[tokio::test]
async fn missing_handles_everywhere_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_stub(dir.path(), "Teams/Imperial Army.md", "## Members\n- [[Veers]]\n");
    let ctx = Arc::new(workspace_with_state(dir.path(), json!({"github": {"teams": ["Imperial Army"]}})));

    let err = run_github(ctx, "http://127.0.0.1:9".to_string(), GithubOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MissingConfiguration(_)));
}
