// src/api/pagination.rs
//! Cursor pagination shared by the jobs.
//!
//! Jira uses `nextPageToken`, Slack `response_metadata.next_cursor` and
//! GitHub page numbers; each adapts its response into a [`Page`].

use crate::error::AppError;

/// One fetched page and the cursor for the next one.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// Result of a pagination run.
#[derive(Debug, Clone)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
}

/// Fetches pages until the cursor runs out or `max_pages` is reached.
///
/// An empty cursor string counts as the end of the sequence.
pub fn collect_pages<T, F>(mut fetch_fn: F, max_pages: Option<u32>) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, AppError>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0u32;

    loop {
        if let Some(max) = max_pages {
            if pages_fetched >= max {
                log::debug!("Reached maximum page limit: {}", max);
                break;
            }
        }

        let page = fetch_fn(cursor.as_deref())?;
        items.extend(page.items);
        pages_fetched += 1;

        match page.next_cursor.filter(|c| !c.is_empty()) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(PaginationResult {
        items,
        pages_fetched,
    })
}
