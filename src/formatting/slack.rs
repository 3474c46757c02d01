// src/formatting/slack.rs
//! Slack message markup cleanup.

use chrono::{DateTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};

static USER_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@([A-Z0-9]+)>").expect("user mention regex is valid"));
static ALIASED_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<#[A-Z0-9]+\|([^>]+)>").expect("channel alias regex is valid"));
static BARE_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<#([A-Z0-9]+)>").expect("channel ref regex is valid"));
static LABELED_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(https?://[^|>]+)\|([^>]+)>").expect("labeled link regex is valid")
});
static BARE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(https?://[^>]+)>").expect("bare link regex is valid"));
static HERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!here\|?[^>]*>").expect("here regex is valid"));
static CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!channel\|?[^>]*>").expect("channel regex is valid"));
static EVERYONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!everyone\|?[^>]*>").expect("everyone regex is valid"));

/// Display names and channel names used to resolve references in text.
#[derive(Debug, Default, Clone)]
pub struct Directory {
    pub users: HashMap<String, String>,
    pub channels: HashMap<String, String>,
}

/// Rewrites Slack markup into readable text.
///
/// `<@U1>` becomes `@Name` (or `@unknown` when the ID is not in the
/// directory; left untouched when the user directory is empty), channel
/// references become `#name`, links become Markdown, and broadcast
/// mentions become `@here`, `@channel` and `@everyone`.
pub fn clean_text(text: &str, directory: &Directory) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = if directory.users.is_empty() {
        text.to_string()
    } else {
        USER_MENTION
            .replace_all(text, |caps: &Captures| {
                let name = directory
                    .users
                    .get(&caps[1])
                    .map(String::as_str)
                    .unwrap_or("unknown");
                format!("@{}", name)
            })
            .into_owned()
    };

    out = ALIASED_CHANNEL.replace_all(&out, "#$1").into_owned();
    out = BARE_CHANNEL
        .replace_all(&out, |caps: &Captures| {
            let id = &caps[1];
            let name = directory.channels.get(id).map(String::as_str).unwrap_or(id);
            format!("#{}", name)
        })
        .into_owned();

    out = LABELED_LINK.replace_all(&out, "[$2]($1)").into_owned();
    out = BARE_LINK.replace_all(&out, "$1").into_owned();

    out = HERE.replace_all(&out, "@here").into_owned();
    out = CHANNEL.replace_all(&out, "@channel").into_owned();
    out = EVERYONE.replace_all(&out, "@everyone").into_owned();

    out.trim().to_string()
}

/// User IDs mentioned as `<@U…>` in `text`.
pub fn mentioned_users(text: &str) -> BTreeSet<String> {
    USER_MENTION
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Channel IDs referenced without an alias, `<#C…>`.
pub fn referenced_channels(text: &str) -> BTreeSet<String> {
    BARE_CHANNEL
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Converts a Slack timestamp (`"1753160757.123400"`) to ISO 8601 UTC.
///
/// Whole seconds print without a fraction, otherwise microseconds are
/// shown. Input that is not a timestamp is returned unchanged.
pub fn ts_to_iso(ts: &str) -> String {
    parse_ts(ts)
        .map(|dt| {
            if dt.timestamp_subsec_micros() == 0 {
                dt.to_rfc3339_opts(SecondsFormat::Secs, true)
            } else {
                dt.to_rfc3339_opts(SecondsFormat::Micros, true)
            }
        })
        .unwrap_or_else(|| ts.to_string())
}

/// Parses a Slack timestamp into UTC, to microsecond precision.
pub fn parse_ts(ts: &str) -> Option<DateTime<chrono::Utc>> {
    let (secs, frac) = match ts.trim().split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (ts.trim(), ""),
    };
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        format!("{:0<6}", &frac[..frac.len().min(6)]).parse().ok()?
    };
    DateTime::from_timestamp(secs, micros * 1_000)
}

/// Sort key for Slack timestamps; unparseable values sort first.
pub fn ts_sort_key(ts: &str) -> f64 {
    ts.parse::<f64>().unwrap_or(0.0)
}
