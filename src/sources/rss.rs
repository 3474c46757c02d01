// src/sources/rss.rs
//! RSS 2.0 and Atom news digest.
//!
//! Feeds are fetched in parallel on the rayon pool behind one shared
//! limiter. A feed that fails to download or parse contributes no
//! articles; the digest is written regardless.

use crate::api::{ApiClient, Auth, RateLimiter, RetryPolicy};
use crate::config::RssOptions;
use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, RSS_CALLS_PER_SECOND, RSS_DEFAULT_DAYS_BACK, RSS_INITIAL_RETRY_DELAY,
    RSS_SUMMARY_MAX_CHARS,
};
use crate::error::AppError;
use crate::formatting::html::{clean_html, decode_entities, truncate_with_ellipsis};
use crate::model::feed::sort_newest_first;
use crate::model::{Article, Digest};
use crate::output::OutputPlan;
use crate::pipeline::{iso_timestamp, JobReport, SnapshotJob, SyncContext};
use crate::state::SyncState;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rayon::prelude::*;
use reqwest::header::HeaderMap;
use std::fmt::Write as _;

/// category → feed name → URL
pub type FeedSet = IndexMap<String, IndexMap<String, String>>;

const DEFAULT_FEEDS: &[(&str, &[(&str, &str)])] = &[
    (
        "ai_ml",
        &[
            ("Last Week in AI", "https://lastweekin.ai/feed"),
            ("OpenAI Blog", "https://openai.com/blog/rss.xml"),
            ("Google AI Blog", "https://blog.google/technology/ai/rss/"),
            ("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
            ("Simon Willison", "https://simonwillison.net/atom/everything/"),
            ("Chip Huyen", "https://huyenchip.com/feed.xml"),
            (
                "MIT Tech Review AI",
                "https://www.technologyreview.com/topic/artificial-intelligence/feed",
            ),
            ("VentureBeat AI", "https://venturebeat.com/category/ai/feed/"),
        ],
    ),
    (
        "engineering_leadership",
        &[
            ("LeadDev", "https://leaddev.com/rss.xml"),
            ("The Pragmatic Engineer", "https://newsletter.pragmaticengineer.com/feed"),
            ("Will Larson", "https://lethain.com/feeds/"),
            ("Jacob Kaplan-Moss", "https://jacobian.org/feed/"),
            ("Camille Fournier", "https://skamille.medium.com/feed"),
            ("Charity Majors", "https://charity.wtf/feed/"),
        ],
    ),
    (
        "tech_news",
        &[
            ("Hacker News (Top)", "https://hnrss.org/best?points=100"),
            ("Ars Technica", "https://feeds.arstechnica.com/arstechnica/technology-lab"),
            (
                "The Verge AI",
                "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            ),
            (
                "TechCrunch AI",
                "https://techcrunch.com/category/artificial-intelligence/feed/",
            ),
        ],
    ),
];

/// The built-in feed set used when the sync state configures none.
pub fn default_feeds() -> FeedSet {
    DEFAULT_FEEDS
        .iter()
        .map(|(category, feeds)| {
            let feeds = feeds
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect();
            (category.to_string(), feeds)
        })
        .collect()
}

/// One `<item>` or `<entry>` as found in the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Summary,
    Content,
}

/// Parses an RSS 2.0 or Atom document into its entries.
pub fn parse_feed(xml: &str, url: &str) -> Result<Vec<FeedEntry>, AppError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut updated: Option<DateTime<Utc>> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| AppError::FeedParse {
            url: url.to_string(),
            message: format!("at byte {}: {}", reader.buffer_position(), e),
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        current = Some(FeedEntry::default());
                        updated = None;
                    }
                    _ if current.is_some() => {
                        if let Some(entry) = current.as_mut() {
                            if name.as_ref() == b"link" {
                                take_atom_link(&e, entry);
                            }
                        }
                        field = field_for(&e);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        take_atom_link(&e, entry);
                    }
                }
            }
            Event::Text(t) if field.is_some() => {
                text.push_str(&decode_entities(&String::from_utf8_lossy(&t)));
            }
            Event::CData(c) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        if let Some(mut entry) = current.take() {
                            entry.published = entry.published.or(updated.take());
                            entries.push(entry);
                        }
                        field = None;
                    }
                    _ => {
                        if let (Some(entry), Some(f)) = (current.as_mut(), field.take()) {
                            let value = std::mem::take(&mut text).trim().to_string();
                            match f {
                                Field::Title => entry.title = entry.title.take().or(Some(value)),
                                Field::Link => {
                                    if entry.link.is_none() && !value.is_empty() {
                                        entry.link = Some(value);
                                    }
                                }
                                Field::Published => {
                                    entry.published = entry.published.or(parse_date(&value))
                                }
                                Field::Updated => updated = updated.or(parse_date(&value)),
                                Field::Summary => entry.summary = entry.summary.take().or(Some(value)),
                                Field::Content => entry.content = entry.content.take().or(Some(value)),
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn field_for(element: &BytesStart<'_>) -> Option<Field> {
    let local = element.local_name();
    let qualified = element.name();
    match (qualified.as_ref(), local.as_ref()) {
        (b"content:encoded", _) => Some(Field::Content),
        (_, b"title") => Some(Field::Title),
        (_, b"link") => Some(Field::Link),
        (_, b"pubDate") | (_, b"published") | (_, b"date") => Some(Field::Published),
        (_, b"updated") => Some(Field::Updated),
        (_, b"description") | (_, b"summary") => Some(Field::Summary),
        (_, b"content") => Some(Field::Content),
        _ => None,
    }
}

/// Atom links carry the URL in `href`; the first alternate link wins.
fn take_atom_link(element: &BytesStart<'_>, entry: &mut FeedEntry) {
    if entry.link.is_some() {
        return;
    }
    let mut href = None;
    let mut rel = None;
    for attr in element.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"href" => href = Some(decode_entities(&value)),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    if matches!(rel.as_deref(), None | Some("alternate")) {
        entry.link = href;
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) dates, normalized to UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Turns feed entries into digest articles, dropping those older than
/// `cutoff`. Undated entries are kept.
pub fn to_articles(entries: Vec<FeedEntry>, source: &str, cutoff: DateTime<Utc>) -> Vec<Article> {
    entries
        .into_iter()
        .filter(|entry| entry.published.map_or(true, |published| published >= cutoff))
        .map(|entry| {
            let raw_summary = entry.summary.or(entry.content).unwrap_or_default();
            Article {
                title: entry
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "No title".to_string()),
                link: entry.link.unwrap_or_default(),
                published: entry.published.as_ref().map(iso_timestamp),
                summary: truncate_with_ellipsis(&clean_html(&raw_summary), RSS_SUMMARY_MAX_CHARS),
                source: source.to_string(),
            }
        })
        .collect()
}

pub struct RssJob {
    client: ApiClient,
    limiter: RateLimiter,
    options: RssOptions,
}

#[derive(Debug, Clone)]
pub struct RssSnapshot {
    pub digest: Digest,
    pub days_back: u32,
    pub failed_feeds: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl RssJob {
    pub fn new(options: RssOptions) -> Result<Self, AppError> {
        let client = ApiClient::new(
            None,
            Auth::None,
            HeaderMap::new(),
            RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, RSS_INITIAL_RETRY_DELAY),
        )?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(RSS_CALLS_PER_SECOND)?,
            options,
        })
    }

    /// Downloads and parses one feed.
    pub fn fetch_feed(&self, name: &str, url: &str, cutoff: DateTime<Utc>) -> Result<Vec<Article>, AppError> {
        let response = self.client.get(url, &[], &self.limiter)?.error_for_status()?;
        let entries = parse_feed(&response.data, url)?;
        let articles = to_articles(entries, name, cutoff);
        log::info!("  \u{2713} {}: {} articles", name, articles.len());
        Ok(articles)
    }
}

impl SnapshotJob for RssJob {
    type Snapshot = RssSnapshot;

    fn name(&self) -> &'static str {
        "rss"
    }

    fn fetch(&self, ctx: &SyncContext) -> Result<RssSnapshot, AppError> {
        let state = ctx.state();
        let rss_state = state.rss.clone().unwrap_or_default();
        let feeds = rss_state
            .feeds
            .filter(|feeds| !feeds.is_empty())
            .unwrap_or_else(default_feeds);
        let days_back = self
            .options
            .days_back
            .or(rss_state.days_back)
            .unwrap_or(RSS_DEFAULT_DAYS_BACK);

        let fetched_at = Utc::now();
        let cutoff = fetched_at - Duration::days(i64::from(days_back));
        log::info!("Fetching RSS feeds (past {} days)", days_back);

        let mut categories = IndexMap::new();
        let mut failed_feeds = Vec::new();
        for (category, category_feeds) in &feeds {
            let results: Vec<(String, Result<Vec<Article>, AppError>)> = category_feeds
                .par_iter()
                .map(|(name, url)| (name.clone(), self.fetch_feed(name, url, cutoff)))
                .collect();

            let mut articles = Vec::new();
            for (name, result) in results {
                match result {
                    Ok(found) => articles.extend(found),
                    Err(e) => {
                        log::warn!("  \u{2717} {}: {}", name, e);
                        failed_feeds.push(name);
                    }
                }
            }
            sort_newest_first(&mut articles);
            categories.insert(category.clone(), articles);
        }

        Ok(RssSnapshot {
            digest: Digest {
                fetched_at: iso_timestamp(&fetched_at),
                categories,
            },
            days_back,
            failed_feeds,
            fetched_at,
        })
    }

    fn compose(&self, snapshot: &RssSnapshot, ctx: &SyncContext) -> Result<OutputPlan, AppError> {
        let dir = ctx.layout().news_dir();
        OutputPlan::new()
            .with_json(dir.join("rss_digest.json"), &snapshot.digest)
            .map(|plan| {
                plan.with_file(
                    dir.join("rss_digest.md"),
                    render_digest(&snapshot.digest, snapshot.days_back, &snapshot.fetched_at),
                )
            })
    }

    fn record(&self, snapshot: &RssSnapshot, state: &mut SyncState) {
        let rss = state.rss_mut();
        rss.last_synced = Some(iso_timestamp(&snapshot.fetched_at));
        rss.total_articles = Some(snapshot.digest.total_articles());
    }

    fn report(&self, snapshot: &RssSnapshot) -> JobReport {
        let report = JobReport::new(self.name(), snapshot.digest.total_articles())
            .with_detail(format!("{} categories", snapshot.digest.categories.len()));
        if snapshot.failed_feeds.is_empty() {
            report
        } else {
            // Unreachable feeds are routine; note them without failing the run.
            report.with_detail(format!("Feeds unavailable: {}", snapshot.failed_feeds.join(", ")))
        }
    }
}

/// `ai_ml` → `Ai Ml`
fn category_title(category: &str) -> String {
    category
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Renders `News/rss_digest.md`.
pub fn render_digest(digest: &Digest, days_back: u32, fetched_at: &DateTime<Utc>) -> String {
    let mut md = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(md, "# RSS Feed Digest\n");
    let _ = writeln!(md, "*Fetched: {}*", fetched_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(md, "*Period: Past {} days*", days_back);
    let _ = writeln!(md, "*Total articles: {}*\n", digest.total_articles());

    for (category, articles) in &digest.categories {
        let _ = writeln!(md, "## {}\n", category_title(category));
        for article in articles {
            let published = article
                .published
                .as_deref()
                .map(|p| p.chars().take(10).collect::<String>())
                .unwrap_or_else(|| "Unknown date".to_string());
            let _ = writeln!(md, "### [{}]({})", article.title, article.link);
            let _ = writeln!(md, "*{} \u{2014} {}*\n", article.source, published);
            if !article.summary.is_empty() {
                let _ = writeln!(md, "{}\n", article.summary);
            }
            md.push_str("---\n\n");
        }
    }
    md
}
