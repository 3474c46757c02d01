// src/sources/slack.rs
//! Slack channel history via the web client's session APIs.
//!
//! Requests are form-encoded POSTs to `{workspace}/api/{method}` carrying
//! the `xoxc-` session token as a form field and the `d` cookie. Slack
//! reports failures in the body (`{"ok": false, "error": ...}`), usually
//! with HTTP 200, so throttling is detected from the body as well.

use crate::api::{collect_pages, ApiClient, ApiResponse, Auth, Page, RateLimiter, RetryPolicy, StatusSignal};
use crate::config::{SlackCredentials, SlackOptions};
use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, SLACK_CHANNEL_PAUSE, SLACK_DEFAULT_LOOKBACK_DAYS,
    SLACK_HISTORY_CALLS_PER_SECOND, SLACK_HISTORY_PAGE_SIZE, SLACK_INITIAL_RETRY_DELAY,
    SLACK_REPLIES_PAGE_SIZE, SLACK_THREAD_CALLS_PER_SECOND, SLACK_UNKNOWN_USER,
    SLACK_USER_BATCH_PAUSE, SLACK_USER_BATCH_SIZE, SLACK_USER_CALLS_PER_SECOND,
};
use crate::error::{AppError, SlackErrorCode};
use crate::formatting::slack::{clean_text, mentioned_users, referenced_channels, ts_sort_key, ts_to_iso, Directory};
use crate::model::slack::{FileRef, RawChannel, RawUser, Reaction};
use crate::model::{ChannelSnapshot, Message, RawMessage, Reply};
use crate::output::{sanitize_filename, OutputPlan};
use crate::pipeline::{iso_timestamp, JobReport, SnapshotJob, SyncContext};
use crate::state::{ChannelConfig, SyncState};
use crate::types::BaseUrl;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};

/// A decoded Slack API answer.
///
/// Reports HTTP 429 to the retry policy when the body says `ratelimited`,
/// so body-level throttling is retried like a real 429.
#[derive(Debug, Clone)]
pub struct SlackEnvelope {
    pub status: u16,
    pub body: Value,
    retry_after: Option<String>,
}

impl SlackEnvelope {
    pub fn from_response(response: ApiResponse<String>) -> Self {
        // Gateways answer 5xx with HTML; keep the status and let the retry
        // policy look at it.
        let body = serde_json::from_str(&response.data).unwrap_or(Value::Null);
        Self {
            status: response.status.as_u16(),
            body,
            retry_after: response.retry_after,
        }
    }

    fn error_code(&self) -> Option<&str> {
        if self.body.get("ok").and_then(Value::as_bool) == Some(true) {
            return None;
        }
        Some(
            self.body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error"),
        )
    }

    /// The body of a successful call, or the error it describes.
    pub fn into_data(self, method: &str, attempts: u32) -> Result<Value, AppError> {
        if self.body.is_null() {
            return Err(AppError::HttpStatus {
                endpoint: method.to_string(),
                status: self.status,
                body_preview: "response body is not JSON".to_string(),
            });
        }
        let Some(code) = self.error_code() else {
            return Ok(self.body);
        };

        let code = SlackErrorCode::from_api_response(code);
        if code.is_auth_failure() {
            Err(AppError::SlackTokenExpired(code))
        } else if code.is_rate_limited() {
            Err(AppError::RateLimited {
                endpoint: method.to_string(),
                attempts,
            })
        } else {
            Err(AppError::SlackApi {
                method: method.to_string(),
                code,
            })
        }
    }
}

impl StatusSignal for SlackEnvelope {
    fn status_code(&self) -> Option<u16> {
        if self.error_code() == Some("ratelimited") {
            Some(429)
        } else {
            Some(self.status)
        }
    }

    /// The `Retry-After` header, else the copy some gateways echo into the
    /// body under `headers`.
    fn retry_hint(&self) -> Option<String> {
        self.retry_after.clone().or_else(|| {
            match self.body.get("headers").and_then(|h| h.get("Retry-After")) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            }
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    has_more: bool,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RepliesPage {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfo {
    user: Option<RawUser>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelInfo {
    channel: Option<RawChannel>,
}

pub struct SlackJob {
    client: ApiClient,
    token: String,
    workspace_url: BaseUrl,
    history_limiter: RateLimiter,
    thread_limiter: RateLimiter,
    user_limiter: RateLimiter,
    options: SlackOptions,
}

/// Outcome of one channel.
#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub name: String,
    pub id: String,
    pub outcome: Result<(ChannelSnapshot, DateTime<Utc>), String>,
}

#[derive(Debug, Clone)]
pub struct SlackSnapshot {
    pub channels: Vec<ChannelResult>,
    pub total_messages: usize,
    /// Set when the session token stopped working mid-run.
    pub aborted: Option<String>,
    pub synced_at: DateTime<Utc>,
}

impl SlackJob {
    pub fn new(credentials: SlackCredentials, options: SlackOptions) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("d={}", credentials.cookie_d.as_str()))
            .map_err(|_| {
                AppError::MissingConfiguration(
                    "SLACK_COOKIE_D contains characters not allowed in a cookie".to_string(),
                )
            })?;
        headers.insert(header::COOKIE, cookie);

        let client = ApiClient::new(
            Some(BaseUrl::parse(&credentials.workspace_url.join("api"))?),
            Auth::None,
            headers,
            RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, SLACK_INITIAL_RETRY_DELAY),
        )?;

        Ok(Self {
            client,
            token: credentials.token.as_str().to_string(),
            workspace_url: credentials.workspace_url,
            history_limiter: RateLimiter::new(SLACK_HISTORY_CALLS_PER_SECOND)?,
            thread_limiter: RateLimiter::new(SLACK_THREAD_CALLS_PER_SECOND)?,
            user_limiter: RateLimiter::new(SLACK_USER_CALLS_PER_SECOND)?,
            options,
        })
    }

    /// Calls `method` and returns the decoded body of a successful answer.
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        limiter: &RateLimiter,
    ) -> Result<T, AppError> {
        let mut form = params.to_vec();
        form.push(("token", self.token.clone()));

        let policy = self.client.retry_policy();
        let envelope = policy.execute(|| {
            self.client
                .post_form_once(method, &form, limiter)
                .map(SlackEnvelope::from_response)
        })?;

        let data = envelope.into_data(method, policy.max_attempts())?;
        serde_json::from_value(data).map_err(|e| {
            AppError::MalformedResponse(format!("Slack {} returned unexpected data: {}", method, e))
        })
    }

    /// Every message in the channel since `oldest`, following cursors.
    fn fetch_messages(&self, channel_id: &str, oldest: i64) -> Result<Vec<RawMessage>, AppError> {
        let result = collect_pages(
            |cursor| {
                let mut params = vec![
                    ("channel", channel_id.to_string()),
                    ("limit", SLACK_HISTORY_PAGE_SIZE.to_string()),
                    ("oldest", oldest.to_string()),
                    ("inclusive", "true".to_string()),
                ];
                if let Some(cursor) = cursor {
                    params.push(("cursor", cursor.to_string()));
                }

                let page: HistoryPage =
                    self.call("conversations.history", &params, &self.history_limiter)?;
                let next_cursor = if page.has_more {
                    page.response_metadata.and_then(|m| m.next_cursor)
                } else {
                    None
                };
                Ok(Page {
                    items: page.messages,
                    next_cursor,
                })
            },
            None,
        )?;
        log::debug!(
            "      {} messages over {} pages",
            result.items.len(),
            result.pages_fetched
        );
        Ok(result.items)
    }

    fn fetch_thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        oldest: i64,
    ) -> Result<Vec<RawMessage>, AppError> {
        let params = [
            ("channel", channel_id.to_string()),
            ("ts", thread_ts.to_string()),
            ("limit", SLACK_REPLIES_PAGE_SIZE.to_string()),
            ("oldest", oldest.to_string()),
        ];
        let page: RepliesPage = self.call("conversations.replies", &params, &self.thread_limiter)?;
        Ok(page.messages)
    }

    /// Display names for `user_ids`. Lookups that fail map to
    /// "Unknown User"; an expired token aborts.
    fn resolve_users(&self, user_ids: &BTreeSet<String>) -> Result<HashMap<String, String>, AppError> {
        let total = user_ids.len();
        let mut names = HashMap::with_capacity(total);

        for (i, user_id) in user_ids.iter().enumerate() {
            let params = [("user", user_id.clone())];
            let name = match self.call::<UserInfo>("users.info", &params, &self.user_limiter) {
                Ok(info) => info.user.and_then(|user| user.display_name()),
                Err(e) if e.is_fatal_auth() => return Err(e),
                Err(e) => {
                    log::debug!("    users.info {} failed: {}", user_id, e);
                    None
                }
            };
            names.insert(
                user_id.clone(),
                name.unwrap_or_else(|| SLACK_UNKNOWN_USER.to_string()),
            );

            let done = i + 1;
            if done % SLACK_USER_BATCH_SIZE == 0 && done < total {
                std::thread::sleep(SLACK_USER_BATCH_PAUSE);
            }
        }
        log::debug!("    Resolved {} users", names.len());
        Ok(names)
    }

    /// Channel names for `channel_ids`; unresolvable IDs map to themselves.
    fn resolve_channels(
        &self,
        channel_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, String>, AppError> {
        let mut names = HashMap::with_capacity(channel_ids.len());
        for channel_id in channel_ids {
            let params = [("channel", channel_id.clone())];
            let name = match self.call::<ChannelInfo>("conversations.info", &params, &self.user_limiter) {
                Ok(info) => info.channel.and_then(|channel| channel.name),
                Err(e) if e.is_fatal_auth() => return Err(e),
                Err(e) => {
                    log::debug!("    conversations.info {} failed: {}", channel_id, e);
                    None
                }
            };
            names.insert(channel_id.clone(), name.unwrap_or_else(|| channel_id.clone()));
        }
        Ok(names)
    }

    /// Fetches, resolves and cleans one channel's messages.
    pub fn sync_channel(
        &self,
        channel_id: &str,
        channel_name: &str,
        oldest: i64,
        include_threads: bool,
    ) -> Result<ChannelSnapshot, AppError> {
        let raw_messages = self.fetch_messages(channel_id, oldest)?;
        if raw_messages.is_empty() {
            log::info!("    No messages found");
            return Ok(ChannelSnapshot {
                channel: channel_name.to_string(),
                channel_id: channel_id.to_string(),
                messages: Vec::new(),
                message_count: 0,
            });
        }
        log::info!("    Found {} messages", raw_messages.len());

        let mut user_ids = BTreeSet::new();
        let mut channel_ids = BTreeSet::new();
        let mut threads: HashMap<String, Vec<RawMessage>> = HashMap::new();

        for message in &raw_messages {
            collect_references(message, &mut user_ids, &mut channel_ids);

            if include_threads && message.is_thread_parent() {
                let replies = self.fetch_thread_replies(channel_id, &message.ts, oldest)?;
                for reply in &replies {
                    collect_references(reply, &mut user_ids, &mut channel_ids);
                }
                threads.insert(message.ts.clone(), replies);
            }
        }
        log::debug!("    Threads fetched: {}", threads.len());

        let directory = Directory {
            users: self.resolve_users(&user_ids)?,
            channels: self.resolve_channels(&channel_ids)?,
        };

        let mut messages: Vec<Message> = raw_messages
            .iter()
            .filter(|message| !message.is_timeline_reply())
            .map(|message| {
                let replies = threads.get(&message.ts).map(Vec::as_slice).unwrap_or_default();
                build_message(message, replies, &directory)
            })
            .collect();
        messages.sort_by(|a, b| ts_sort_key(&a.ts).total_cmp(&ts_sort_key(&b.ts)));

        Ok(ChannelSnapshot {
            channel: channel_name.to_string(),
            channel_id: channel_id.to_string(),
            message_count: messages.len(),
            messages,
        })
    }

    /// Configured channels, narrowed to `--channel` when given.
    fn select_channels(&self, state: &SyncState) -> Result<Vec<ChannelConfig>, AppError> {
        let configured = state
            .slack
            .as_ref()
            .and_then(|slack| slack.channels.clone())
            .unwrap_or_default();
        if configured.is_empty() {
            return Err(AppError::MissingConfiguration(
                "no Slack channels configured; add them under slack.channels in config.json"
                    .to_string(),
            ));
        }

        let Some(wanted) = &self.options.channel else {
            return Ok(configured);
        };
        let selected: Vec<ChannelConfig> = configured
            .iter()
            .filter(|channel| channel.name.as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect();
        if selected.is_empty() {
            let available = configured
                .iter()
                .map(|c| c.name.as_deref().unwrap_or("?"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::MissingConfiguration(format!(
                "channel '{}' not found in config (available: {})",
                wanted, available
            )));
        }
        Ok(selected)
    }
}

fn collect_references(
    message: &RawMessage,
    user_ids: &mut BTreeSet<String>,
    channel_ids: &mut BTreeSet<String>,
) {
    if let Some(user) = message.user.as_deref().filter(|u| !u.is_empty()) {
        user_ids.insert(user.to_string());
    }
    user_ids.extend(mentioned_users(&message.text));
    channel_ids.extend(referenced_channels(&message.text));
}

fn user_name(directory: &Directory, user_id: &str) -> String {
    directory
        .users
        .get(user_id)
        .cloned()
        .unwrap_or_else(|| SLACK_UNKNOWN_USER.to_string())
}

/// Builds the snapshot form of `message` with its thread `replies`.
pub fn build_message(message: &RawMessage, replies: &[RawMessage], directory: &Directory) -> Message {
    let replies = replies
        .iter()
        .filter(|reply| reply.ts != message.ts)
        .map(|reply| Reply {
            ts: reply.ts.clone(),
            user_id: reply.user_id().to_string(),
            user_name: user_name(directory, reply.user_id()),
            text: clean_text(&reply.text, directory),
            timestamp: ts_to_iso(&reply.ts),
        })
        .collect();

    Message {
        ts: message.ts.clone(),
        user_id: message.user_id().to_string(),
        user_name: user_name(directory, message.user_id()),
        text: clean_text(&message.text, directory),
        timestamp: ts_to_iso(&message.ts),
        thread_ts: if message.reply_count > 0 {
            message.thread_ts.clone()
        } else {
            None
        },
        reply_count: message.reply_count,
        reactions: message
            .reactions
            .iter()
            .map(|r| Reaction {
                name: r.name.clone(),
                count: r.count,
            })
            .collect(),
        files: message
            .files
            .iter()
            .map(|f| FileRef {
                name: f.name.clone(),
                mimetype: f.mimetype.clone(),
            })
            .collect(),
        replies,
    }
}

/// Start of the fetch window: the lookback horizon, moved forward to the
/// channel's last sync unless `full` is set.
pub fn oldest_timestamp(
    now: DateTime<Utc>,
    lookback_days: u32,
    last_synced: Option<&str>,
    full: bool,
) -> DateTime<Utc> {
    let horizon = now - Duration::days(i64::from(lookback_days));
    if full {
        return horizon;
    }
    last_synced
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|last| last.with_timezone(&Utc).max(horizon))
        .unwrap_or(horizon)
}

impl SnapshotJob for SlackJob {
    type Snapshot = SlackSnapshot;

    fn name(&self) -> &'static str {
        "slack"
    }

    fn fetch(&self, ctx: &SyncContext) -> Result<SlackSnapshot, AppError> {
        let state = ctx.state();
        let slack_state = state.slack.clone().unwrap_or_default();
        let channels = self.select_channels(&state)?;
        let lookback_days = self
            .options
            .lookback_days
            .or(slack_state.lookback_days)
            .unwrap_or(SLACK_DEFAULT_LOOKBACK_DAYS);
        let include_threads = slack_state.include_threads.unwrap_or(true);
        let last_synced = slack_state.last_synced_channels.unwrap_or_default();

        log::info!("  Channels: {}", channels.len());
        log::info!("  Lookback: {} days", lookback_days);
        log::info!("  Threads: {}", if include_threads { "yes" } else { "no" });

        let mut results = Vec::new();
        let mut total_messages = 0;
        let mut aborted = None;

        for (i, channel) in channels.iter().enumerate() {
            let name = channel.name().to_string();
            if !channel.is_enabled() {
                log::info!("  [{}] Skipped (disabled)", name);
                continue;
            }
            let Some(id) = channel.id.clone().filter(|id| !id.is_empty()) else {
                log::info!("  [{}] Skipped (no channel ID)", name);
                continue;
            };
            log::info!("  [{}] (ID: {})", name, id);

            let oldest = oldest_timestamp(
                Utc::now(),
                lookback_days,
                last_synced.get(&id).map(String::as_str),
                self.options.full,
            );
            log::info!(
                "    Fetching messages since {}...",
                oldest.format("%Y-%m-%d %H:%M UTC")
            );

            match self.sync_channel(&id, &name, oldest.timestamp(), include_threads) {
                Ok(snapshot) => {
                    log::info!("    Saved {} messages", snapshot.message_count);
                    total_messages += snapshot.message_count;
                    results.push(ChannelResult {
                        name,
                        id,
                        outcome: Ok((snapshot, Utc::now())),
                    });
                    if channels.len() > 1 && i + 1 < channels.len() {
                        std::thread::sleep(SLACK_CHANNEL_PAUSE);
                    }
                }
                Err(e) if e.is_fatal_auth() => {
                    log::error!("    {}", e);
                    log::error!("  Stopping: Slack token needs to be refreshed");
                    results.push(ChannelResult {
                        name,
                        id,
                        outcome: Err("expired_token".to_string()),
                    });
                    aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    log::error!("    {}", e);
                    results.push(ChannelResult {
                        name,
                        id,
                        outcome: Err(e.to_string()),
                    });
                }
            }
        }

        Ok(SlackSnapshot {
            channels: results,
            total_messages,
            aborted,
            synced_at: Utc::now(),
        })
    }

    fn compose(&self, snapshot: &SlackSnapshot, ctx: &SyncContext) -> Result<OutputPlan, AppError> {
        let dir = ctx.layout().slack_dir();
        let mut plan = OutputPlan::new().with_directory(&dir);

        for result in &snapshot.channels {
            if let Ok((channel, _)) = &result.outcome {
                plan = plan.with_json(
                    dir.join(sanitize_filename(&result.name)).join("messages.json"),
                    channel,
                )?;
            }
        }

        let meta = json!({
            "last_synced": iso_timestamp(&snapshot.synced_at),
            "total_messages": snapshot.total_messages,
            "channels_synced": snapshot.channels.len(),
            "workspace_url": self.workspace_url.as_str(),
        });
        plan.with_json(dir.join("_meta.json"), &meta)
    }

    fn record(&self, snapshot: &SlackSnapshot, state: &mut SyncState) {
        let slack = state.slack_mut();
        let marks = slack.last_synced_channels.get_or_insert_with(Default::default);
        for result in &snapshot.channels {
            if let Ok((_, synced_at)) = &result.outcome {
                marks.insert(result.id.clone(), iso_timestamp(synced_at));
            }
        }
        slack.last_synced = Some(iso_timestamp(&snapshot.synced_at));
        slack.total_messages = Some(snapshot.total_messages);
    }

    fn report(&self, snapshot: &SlackSnapshot) -> JobReport {
        let mut report = JobReport::new(self.name(), snapshot.total_messages);
        for result in &snapshot.channels {
            match &result.outcome {
                Ok((channel, _)) => {
                    report = report.with_detail(format!(
                        "{}: {} messages (OK)",
                        result.name, channel.message_count
                    ));
                }
                Err(reason) => {
                    report = report.with_failures([format!("{}: FAIL({})", result.name, reason)]);
                }
            }
        }
        if let Some(reason) = &snapshot.aborted {
            report = report.with_failures([reason.clone()]);
        }
        report
    }
}
