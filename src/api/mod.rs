// src/api/mod.rs
//! Outbound HTTP plumbing: the ability to call a vendor API politely.
//!
//! Every job goes through [`ApiClient`], which waits on a [`RateLimiter`]
//! before each attempt and retries transient failures via [`RetryPolicy`].

pub mod client;
pub mod pagination;
pub mod rate_limit;
pub mod retry;

pub use client::{ApiClient, ApiResponse, Auth};
pub use pagination::{collect_pages, Page, PaginationResult};
pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, RetryableError, StatusSignal, TransientKind};
