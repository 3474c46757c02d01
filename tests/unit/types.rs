// tests/unit/types.rs
//! Validation of user-supplied identifiers and credentials

use context_sync::config::{GithubCredentials, JiraCredentials, SlackCredentials};
use context_sync::{AppError, ApiToken, BaseUrl, ChannelId, IssueKey, KeyPrefix, ValidationError};
use std::collections::HashMap;

fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<&str, &str> = vars.iter().copied().collect();
    move |name: &str| map.get(name).map(|v| v.to_string())
}

#[test]
fn issue_keys_normalize_and_reject_jql_fragments() {
    assert_eq!(IssueKey::parse(" emp-42 ").unwrap().as_str(), "EMP-42");
    assert_eq!(IssueKey::parse("DS2-7").unwrap().as_str(), "DS2-7");

    for bad in ["EMP", "42-EMP", "EMP-", "EMP-1 OR 1=1", "E-1", ""] {
        assert!(
            matches!(IssueKey::parse(bad), Err(ValidationError::InvalidIssueKey(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn key_prefixes_allow_trailing_dash() {
    assert_eq!(KeyPrefix::parse("team-").unwrap().as_str(), "TEAM-");
    assert_eq!(KeyPrefix::parse("TEAM").unwrap().as_str(), "TEAM");
    assert!(KeyPrefix::parse("TEAM-1").is_err());
    assert!(KeyPrefix::parse("te am").is_err());
}

#[test]
fn channel_ids_are_uppercase_alphanumeric() {
    assert!(ChannelId::parse("C0123ABCD").is_ok());
    assert!(ChannelId::parse("#general").is_err());
}

#[test]
fn base_urls_drop_trailing_slashes_and_join_cleanly() {
    let base = BaseUrl::parse("https://empire.atlassian.net/").unwrap();
    assert_eq!(base.as_str(), "https://empire.atlassian.net");
    assert_eq!(
        base.join("/rest/api/3/issue/EMP-1"),
        "https://empire.atlassian.net/rest/api/3/issue/EMP-1"
    );
    assert!(BaseUrl::parse("ftp://empire.net").is_err());
    assert!(BaseUrl::parse("not a url").is_err());
}

#[test]
fn tokens_never_print_in_full() {
    let token = ApiToken::new("xoxc-1234567890").unwrap();
    assert_eq!(token.to_string(), "xoxc...");
    assert!(!format!("{:?}", token).contains("567890"));
    assert!(ApiToken::new("   ").is_err());
}

#[test]
fn jira_credentials_require_every_variable() {
    let err = JiraCredentials::from_lookup(lookup(&[
        ("JIRA_EMAIL", "vader@empire.test"),
        ("JIRA_BASE_URL", "https://empire.atlassian.net"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::MissingConfiguration(ref msg) if msg.contains("JIRA_API_TOKEN")));

    let creds = JiraCredentials::from_lookup(lookup(&[
        ("JIRA_EMAIL", "vader@empire.test"),
        ("JIRA_API_TOKEN", "secret"),
        ("JIRA_BASE_URL", "https://empire.atlassian.net/"),
    ]))
    .unwrap();
    assert_eq!(creds.base_url.as_str(), "https://empire.atlassian.net");
}

#[test]
fn github_placeholder_token_is_rejected() {
    let err = GithubCredentials::from_lookup(lookup(&[(
        "GITHUB_TOKEN",
        context_sync::constants::GITHUB_TOKEN_PLACEHOLDER,
    )]))
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidToken { .. })
    ));
}

#[test]
fn slack_workspace_url_is_required() {
    let err = SlackCredentials::from_lookup(lookup(&[
        ("SLACK_SESSION_TOKEN", "xoxc-abc"),
        ("SLACK_COOKIE_D", "xoxd-def"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("SLACK_WORKSPACE_URL"));
}
