// src/formatting/html.rs
//! Plain-text extraction from HTML feed summaries.

use once_cell::sync::Lazy;
use quick_xml::escape::unescape_with;
use regex::{Captures, Regex};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("entity regex is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Named entities decoded in feed text, on top of numeric references.
fn resolve_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        _ => return None,
    })
}

/// Decodes character and entity references. Unknown ones stay as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let raw = &caps[0];
            unescape_with(raw, resolve_entity)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .into_owned()
}

/// Strips tags, decodes entities and collapses whitespace.
pub fn clean_html(raw_html: &str) -> String {
    if raw_html.is_empty() {
        return String::new();
    }
    let stripped = TAG.replace_all(raw_html, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Cuts `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
