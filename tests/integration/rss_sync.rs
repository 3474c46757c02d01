// tests/integration/rss_sync.rs
//! RSS digest built from feeds served by the mock server

use crate::common::{read_json, read_state, workspace_with_state};
use chrono::{Duration, Utc};
use context_sync::config::RssOptions;
use context_sync::{run_job, AppError, JobReport, RssJob, SyncContext};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_rss(ctx: Arc<SyncContext>, options: RssOptions) -> Result<JobReport, AppError> {
    tokio::task::spawn_blocking(move || -> Result<JobReport, AppError> {
        let job = RssJob::new(options)?;
        run_job(&job, &ctx)
    })
    .await
    .expect("rss job should not panic")
}

fn rss_feed() -> String {
    let recent = (Utc::now() - Duration::days(1)).to_rfc2822();
    let stale = (Utc::now() - Duration::days(30)).to_rfc2822();
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Gazette</title>
  <item>
    <title>Fleet arrives at Endor</title>
    <link>https://gazette.empire/endor</link>
    <pubDate>{recent}</pubDate>
    <description>&lt;p&gt;The &lt;b&gt;fleet&lt;/b&gt; is in position.&lt;/p&gt;</description>
  </item>
  <item>
    <title>Old victory parade</title>
    <link>https://gazette.empire/parade</link>
    <pubDate>{stale}</pubDate>
  </item>
</channel></rss>"#
    )
}

fn atom_feed() -> String {
    let updated = (Utc::now() - Duration::hours(2)).to_rfc3339();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Holonet</title>
  <entry>
    <title>Shield generator online</title>
    <link href="https://holonet.empire/shield"/>
    <updated>{updated}</updated>
    <content type="html">Generator &lt;i&gt;operational&lt;/i&gt;</content>
  </entry>
</feed>"#
    )
}

#[tokio::test]
async fn builds_digest_from_configured_feeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gazette.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/holonet.atom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(workspace_with_state(
        dir.path(),
        json!({"rss": {
            "feeds": {
                "imperial_news": {
                    "Gazette": format!("{}/gazette.xml", server.uri()),
                    "Holonet": format!("{}/holonet.atom", server.uri())
                },
                "rebel_watch": {
                    "Gone": format!("{}/gone.xml", server.uri())
                }
            },
            "days_back": 30
        }}),
    ));

    let report = run_rss(ctx, RssOptions { days_back: Some(7) }).await.unwrap();
    assert_eq!(report.items, 2);
    assert!(report.details.iter().any(|d| d == "Feeds unavailable: Gone"));

    let news_dir = dir.path().join("Synced-Data/News");
    let digest = read_json(&news_dir.join("rss_digest.json"));
    let imperial = digest["categories"]["imperial_news"].as_array().unwrap();
    assert_eq!(imperial.len(), 2);
    // Newest first: the Atom entry is two hours old, the RSS item a day.
    assert_eq!(imperial[0]["title"], "Shield generator online");
    assert_eq!(imperial[0]["link"], "https://holonet.empire/shield");
    assert_eq!(imperial[0]["summary"], "Generator operational");
    assert_eq!(imperial[0]["source"], "Holonet");
    assert_eq!(imperial[1]["summary"], "The fleet is in position.");
    assert_eq!(digest["categories"]["rebel_watch"], json!([]));

    let markdown = std::fs::read_to_string(news_dir.join("rss_digest.md")).unwrap();
    assert!(markdown.starts_with("# RSS Feed Digest\n\n"));
    assert!(markdown.contains("*Period: Past 7 days*"));
    assert!(markdown.contains("*Total articles: 2*"));
    assert!(markdown.contains("## Imperial News\n\n### [Shield generator online](https://holonet.empire/shield)"));
    assert!(markdown.contains("## Rebel Watch\n\n"));
    assert!(!markdown.contains("Old victory parade"));

    let state = read_state(dir.path());
    assert_eq!(state["rss"]["total_articles"], 2);
    assert_eq!(state["rss"]["days_back"], 30);
    assert!(state["rss"]["last_synced"].is_string());
}
