// tests/unit/text_cleanup.rs
//! Slack markup and feed HTML cleanup

use context_sync::formatting::slack::{mentioned_users, referenced_channels, ts_sort_key};
use context_sync::formatting::{clean_html, clean_text, truncate_with_ellipsis, ts_to_iso, Directory};
use pretty_assertions::assert_eq;

fn directory() -> Directory {
    let mut directory = Directory::default();
    directory.users.insert("U01VADER".to_string(), "Darth Vader".to_string());
    directory.users.insert("U02TARKIN".to_string(), "Grand Moff Tarkin".to_string());
    directory.channels.insert("C01OPS".to_string(), "death-star-ops".to_string());
    directory
}

#[test]
fn full_message_is_readable() {
    let text = "<@U01VADER> please review <https://plans.empire/ds2|the plans> in <#C01OPS> \
                and <#C02XYZ|bridge> <!here>";
    assert_eq!(
        clean_text(text, &directory()),
        "@Darth Vader please review [the plans](https://plans.empire/ds2) in #death-star-ops \
         and #bridge @here"
    );
}

#[test]
fn unknown_users_and_channels_degrade_gracefully() {
    assert_eq!(
        clean_text("ping <@U99NOBODY> in <#C99GONE>", &directory()),
        "ping @unknown in #C99GONE"
    );
}

#[test]
fn empty_directory_leaves_mentions_alone() {
    assert_eq!(
        clean_text("  <@U01VADER> <!channel|channel> <!everyone>  ", &Directory::default()),
        "<@U01VADER> @channel @everyone"
    );
}

#[test]
fn bare_links_lose_brackets() {
    assert_eq!(
        clean_text("see <https://empire.test/a?b=c>", &Directory::default()),
        "see https://empire.test/a?b=c"
    );
}

#[test]
fn references_are_collected_in_sorted_order() {
    let text = "<@U02TARKIN> <@U01VADER> <@U02TARKIN> <#C01OPS> <#C02XYZ|bridge>";
    assert_eq!(
        mentioned_users(text).into_iter().collect::<Vec<_>>(),
        vec!["U01VADER", "U02TARKIN"]
    );
    assert_eq!(
        referenced_channels(text).into_iter().collect::<Vec<_>>(),
        vec!["C01OPS"]
    );
}

#[test]
fn slack_timestamps_convert_exactly() {
    assert_eq!(ts_to_iso("1753160757.123400"), "2025-07-22T05:05:57.123400Z");
    assert_eq!(ts_to_iso("1753160757.000000"), "2025-07-22T05:05:57Z");
    assert_eq!(ts_to_iso("1753160757"), "2025-07-22T05:05:57Z");
    assert_eq!(ts_to_iso("garbage"), "garbage");
    assert!(ts_sort_key("1753160757.5") > ts_sort_key("1753160757.123400"));
    assert_eq!(ts_sort_key("garbage"), 0.0);
}

#[test]
fn feed_html_is_flattened() {
    let html = "<div class=\"post\"><h1>Orbit</h1>\n<p>Status:&nbsp;<em>green</em> &amp; steady</p></div>";
    assert_eq!(clean_html(html), "Orbit Status: green & steady");
}

#[test]
fn truncation_counts_characters() {
    let text = "Ω".repeat(10);
    assert_eq!(truncate_with_ellipsis(&text, 4), "ΩΩΩΩ...");
    assert_eq!(truncate_with_ellipsis(&text, 10), text);
}
