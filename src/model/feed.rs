// src/model/feed.rs
//! RSS digest schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// UTC publication time, `YYYY-MM-DDTHH:MM:SSZ`.
    pub published: Option<String>,
    pub summary: String,
    pub source: String,
}

/// Contents of `News/rss_digest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub fetched_at: String,
    pub categories: IndexMap<String, Vec<Article>>,
}

impl Digest {
    pub fn total_articles(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

/// Newest first; undated articles last.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published.cmp(&a.published));
}
