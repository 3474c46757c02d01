// src/formatting/mod.rs
//! Text cleanup for vendor payloads: Slack markup and HTML summaries.
//!
//! Rich Jira documents live in [`crate::document`]; this module covers the
//! flatter formats.

pub mod html;
pub mod slack;

pub use html::{clean_html, decode_entities, truncate_with_ellipsis};
pub use slack::{clean_text, ts_to_iso, Directory};
