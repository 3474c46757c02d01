// tests/unit/pagination.rs
//! Cursor pagination and retry policy behavior seen from callers

use context_sync::api::{collect_pages, Page, RetryPolicy, StatusSignal};
use context_sync::AppError;
use std::cell::Cell;
use std::time::Duration;

#[test]
fn follows_cursors_until_exhausted() {
    let mut seen = Vec::new();
    let result = collect_pages(
        |cursor| {
            seen.push(cursor.map(str::to_string));
            Ok(match cursor {
                None => Page { items: vec![1, 2], next_cursor: Some("b".to_string()) },
                Some("b") => Page { items: vec![3], next_cursor: Some(String::new()) },
                Some(other) => panic!("unexpected cursor {other}"),
            })
        },
        None,
    )
    .unwrap();

    assert_eq!(result.items, vec![1, 2, 3]);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(seen, vec![None, Some("b".to_string())]);
}

#[test]
fn page_limit_stops_early() {
    let result = collect_pages(
        |_| Ok(Page { items: vec!["x"], next_cursor: Some("again".to_string()) }),
        Some(3),
    )
    .unwrap();
    assert_eq!(result.items.len(), 3);
}

#[test]
fn page_errors_abort_the_walk() {
    let result: Result<_, AppError> = collect_pages::<u8, _>(
        |_| Err(AppError::MalformedResponse("bad page".to_string())),
        None,
    );
    assert!(matches!(result, Err(AppError::MalformedResponse(_))));
}

struct Status(u16);

impl StatusSignal for Status {
    fn status_code(&self) -> Option<u16> {
        Some(self.0)
    }

    fn retry_hint(&self) -> Option<String> {
        Some("0".to_string())
    }
}

#[test]
fn exhausted_status_retries_return_the_last_response() {
    let calls = Cell::new(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    let result: Result<Status, AppError> = policy.execute(|| {
        calls.set(calls.get() + 1);
        Ok(Status(503))
    });
    assert_eq!(calls.get(), 3);
    assert_eq!(result.unwrap().0, 503);
}

#[test]
fn non_retryable_status_returns_immediately() {
    let calls = Cell::new(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    let result: Result<Status, AppError> = policy.execute(|| {
        calls.set(calls.get() + 1);
        Ok(Status(404))
    });
    assert_eq!(calls.get(), 1);
    assert_eq!(result.unwrap().0, 404);
}
