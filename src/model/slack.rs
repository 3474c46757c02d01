// src/model/slack.rs
//! Slack Web API payloads and the channel snapshot schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub ts: String,
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reply_count: u64,
    pub subtype: Option<String>,
    #[serde(default)]
    pub reactions: Vec<RawReaction>,
    #[serde(default)]
    pub files: Vec<RawFile>,
}

impl RawMessage {
    /// Parent of a thread that has replies.
    pub fn is_thread_parent(&self) -> bool {
        self.reply_count > 0 && self.thread_ts.as_deref() == Some(self.ts.as_str())
    }

    /// A reply broadcast into the channel timeline. Those with a subtype
    /// (e.g. `thread_broadcast`) are kept.
    pub fn is_timeline_reply(&self) -> bool {
        match self.thread_ts.as_deref() {
            Some(thread_ts) => thread_ts != self.ts && self.subtype.is_none(),
            None => false,
        }
    }

    pub fn user_id(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReaction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mimetype: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    pub name: Option<String>,
    pub real_name: Option<String>,
    pub profile: Option<RawProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
}

impl RawUser {
    /// First non-empty of real name, profile display name, profile real
    /// name and handle.
    pub fn display_name(&self) -> Option<String> {
        let profile = self.profile.as_ref();
        [
            self.real_name.as_deref(),
            profile.and_then(|p| p.display_name.as_deref()),
            profile.and_then(|p| p.real_name.as_deref()),
            self.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChannel {
    pub name: Option<String>,
}

// --- Snapshot schema ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub timestamp: String,
    pub thread_ts: Option<String>,
    pub reply_count: u64,
    pub reactions: Vec<Reaction>,
    pub files: Vec<FileRef>,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub mimetype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ts: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub timestamp: String,
}

/// Contents of `Slack/{channel}/messages.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub channel: String,
    pub channel_id: String,
    pub messages: Vec<Message>,
    pub message_count: usize,
}
