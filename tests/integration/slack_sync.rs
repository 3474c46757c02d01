// tests/integration/slack_sync.rs
//! Slack channel sync through the session-token Web API

use crate::common::{read_json, read_state, workspace_with_state};
use context_sync::config::{SlackCredentials, SlackOptions};
use context_sync::{run_job, AppError, ApiToken, BaseUrl, JobReport, SlackJob, SyncContext};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_slack(ctx: Arc<SyncContext>, base: String, options: SlackOptions) -> Result<JobReport, AppError> {
    tokio::task::spawn_blocking(move || -> Result<JobReport, AppError> {
        let credentials = SlackCredentials {
            token: ApiToken::new("xoxc-imperial")?,
            cookie_d: ApiToken::new("xoxd-cookie")?,
            workspace_url: BaseUrl::parse(&base)?,
        };
        let job = SlackJob::new(credentials, options)?;
        run_job(&job, &ctx)
    })
    .await
    .expect("slack job should not panic")
}

fn ok(body: serde_json::Value) -> ResponseTemplate {
    let mut body = body;
    body["ok"] = json!(true);
    ResponseTemplate::new(200).set_body_json(body)
}

fn slack_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": code}))
}

const PARENT_TS: &str = "1753160757.123400";

#[tokio::test]
async fn syncs_channel_with_threads_after_rate_limit() {
    let server = MockServer::start().await;

    // First history call is throttled in the body, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/api/conversations.history"))
        .respond_with(slack_error("ratelimited").insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/conversations.history"))
        .and(header("cookie", "d=xoxd-cookie"))
        .and(body_string_contains("token=xoxc-imperial"))
        .and(body_string_contains("channel=C01OPS"))
        .respond_with(ok(json!({
            "has_more": false,
            "messages": [
                {
                    "ts": PARENT_TS,
                    "user": "U01VADER",
                    "text": "Status report <@U02TARKIN>? See <#C01OPS>",
                    "thread_ts": PARENT_TS,
                    "reply_count": 1,
                    "reactions": [{"name": "eyes", "count": 2}]
                },
                {"ts": "1753160700.000100", "user": "U01VADER", "text": "Morning."},
                {
                    "ts": "1753160800.000000",
                    "user": "U02TARKIN",
                    "text": "All clear",
                    "thread_ts": PARENT_TS
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/conversations.replies"))
        .and(body_string_contains("ts=1753160757.123400"))
        .respond_with(ok(json!({
            "messages": [
                {"ts": PARENT_TS, "user": "U01VADER", "text": "Status report", "thread_ts": PARENT_TS},
                {"ts": "1753160800.000000", "user": "U02TARKIN", "text": "All clear", "thread_ts": PARENT_TS}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users.info"))
        .and(body_string_contains("user=U01VADER"))
        .respond_with(ok(json!({"user": {"name": "vader", "profile": {"display_name": "Lord Vader"}}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users.info"))
        .and(body_string_contains("user=U02TARKIN"))
        .respond_with(slack_error("user_not_found"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/conversations.info"))
        .respond_with(ok(json!({"channel": {"name": "death-star-ops"}})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"slack": {
            "channels": [
                {"name": "death-star-ops", "id": "C01OPS"},
                {"name": "archive", "id": "C09OLD", "enabled": false},
                {"name": "pending"}
            ],
            "lookback_days": 7
        }}),
    ));

    let report = run_slack(ctx, server.uri(), SlackOptions::default()).await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.items, 2);

    let snapshot = read_json(&dir.path().join("Synced-Data/Slack/death-star-ops/messages.json"));
    assert_eq!(snapshot["channel_id"], "C01OPS");
    assert_eq!(snapshot["message_count"], 2);

    let messages = snapshot["messages"].as_array().unwrap();
    assert_eq!(messages[0]["text"], "Morning.");
    assert_eq!(messages[0]["timestamp"], "2025-07-22T05:05:00.000100Z");

    let parent = &messages[1];
    assert_eq!(parent["user_name"], "Lord Vader");
    assert_eq!(parent["text"], "Status report @Unknown User? See #death-star-ops");
    assert_eq!(parent["timestamp"], "2025-07-22T05:05:57.123400Z");
    assert_eq!(parent["thread_ts"], PARENT_TS);
    assert_eq!(parent["reactions"], json!([{"name": "eyes", "count": 2}]));
    assert_eq!(parent["replies"].as_array().unwrap().len(), 1);
    assert_eq!(parent["replies"][0]["text"], "All clear");
    assert_eq!(parent["replies"][0]["user_name"], "Unknown User");
    assert_eq!(parent["replies"][0]["timestamp"], "2025-07-22T05:06:40Z");

    let meta = read_json(&dir.path().join("Synced-Data/Slack/_meta.json"));
    assert_eq!(meta["total_messages"], 2);
    assert_eq!(meta["workspace_url"], server.uri());

    let state = read_state(dir.path());
    assert!(state["slack"]["last_synced_channels"]["C01OPS"].is_string());
    assert!(state["slack"]["last_synced_channels"].get("C09OLD").is_none());
    assert_eq!(state["slack"]["total_messages"], 2);
    assert_eq!(state["slack"]["channels"][1]["enabled"], false);
}

#[tokio::test]
async fn expired_token_stops_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/conversations.history"))
        .respond_with(slack_error("invalid_auth"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"slack": {"channels": [
            {"name": "bridge", "id": "C01BRIDGE"},
            {"name": "hangar", "id": "C02HANGAR"}
        ]}}),
    ));

    let report = run_slack(ctx, server.uri(), SlackOptions::default()).await.unwrap();
    assert!(!report.is_success());
    assert_eq!(report.items, 0);
    assert!(report.failures.iter().any(|f| f == "bridge: FAIL(expired_token)"));
    assert!(report.failures.iter().any(|f| f.contains("Re-extract")));

    assert!(!dir.path().join("Synced-Data/Slack/bridge").exists());
    let state = read_state(dir.path());
    assert_eq!(state["slack"]["last_synced_channels"], json!({}));
}

#[tokio::test]
async fn unknown_channel_option_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"slack": {"channels": [{"name": "bridge", "id": "C01BRIDGE"}]}}),
    ));
    let options = SlackOptions {
        channel: Some("cantina".to_string()),
        ..Default::default()
    };

    let err = run_slack(ctx, "http://127.0.0.1:9".to_string(), options).await.unwrap_err();
    assert!(matches!(err, AppError::MissingConfiguration(ref msg) if msg.contains("available: bridge")));
}
