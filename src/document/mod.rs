// src/document/mod.rs
//! Atlassian Document Format to Markdown conversion.
//!
//! Jira descriptions and comment bodies arrive as ADF trees. [`convert`] is
//! the entry point used by the sync jobs: it never fails, and any problem
//! with the payload turns into a one-line placeholder instead.

mod node;
mod render;

pub use node::{Document, DocumentError, Mark, Node};
pub use render::{render_document, render_node};

use serde_json::Value;

/// Converts an ADF payload to Markdown.
///
/// Absent, null, non-object and empty-object inputs produce an empty string.
pub fn convert(adf: Option<&Value>) -> String {
    let Some(Value::Object(root)) = adf else {
        return String::new();
    };
    if root.is_empty() {
        return String::new();
    }

    match Document::from_map(root).and_then(|document| render_document(&document)) {
        Ok(markdown) => markdown,
        Err(e) => {
            log::debug!("ADF conversion failed: {}", e);
            format!("[Error converting description: {}]", e)
        }
    }
}
