// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names what went wrong and where. Transient failures are
//! classified through [`RetryableError`] so the retry policy can decide
//! without string matching.

use crate::api::retry::{RetryableError, TransientKind};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Slack Web API error codes as a typed vocabulary.
///
/// Slack reports failures as `{"ok": false, "error": "<code>"}` with an
/// HTTP 200, so the code string is the only signal available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackErrorCode {
    InvalidAuth,
    TokenRevoked,
    NotAuthed,
    AccountInactive,
    TokenExpired,
    RateLimited,
    ChannelNotFound,
    UserNotFound,
    NotInChannel,
    Unknown(String),
}

impl SlackErrorCode {
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "invalid_auth" => Self::InvalidAuth,
            "token_revoked" => Self::TokenRevoked,
            "not_authed" => Self::NotAuthed,
            "account_inactive" => Self::AccountInactive,
            "token_expired" => Self::TokenExpired,
            "ratelimited" => Self::RateLimited,
            "channel_not_found" => Self::ChannelNotFound,
            "user_not_found" => Self::UserNotFound,
            "not_in_channel" => Self::NotInChannel,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the session token has to be re-extracted before anything
    /// else can succeed.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidAuth
                | Self::TokenRevoked
                | Self::NotAuthed
                | Self::AccountInactive
                | Self::TokenExpired
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl fmt::Display for SlackErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAuth => write!(f, "invalid_auth"),
            Self::TokenRevoked => write!(f, "token_revoked"),
            Self::NotAuthed => write!(f, "not_authed"),
            Self::AccountInactive => write!(f, "account_inactive"),
            Self::TokenExpired => write!(f, "token_expired"),
            Self::RateLimited => write!(f, "ratelimited"),
            Self::ChannelNotFound => write!(f, "channel_not_found"),
            Self::UserNotFound => write!(f, "user_not_found"),
            Self::NotInChannel => write!(f, "not_in_channel"),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("HTTP {status} from {endpoint}: {body_preview}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body_preview: String,
    },

    #[error("Slack API {method} failed: {code}")]
    SlackApi { method: String, code: SlackErrorCode },

    #[error("Slack token expired or invalid ({0}). Re-extract it from the browser session.")]
    SlackTokenExpired(SlackErrorCode),

    #[error("Rate limited by {endpoint} after {attempts} attempts")]
    RateLimited { endpoint: String, attempts: u32 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Feed parse error for {url}: {message}")]
    FeedParse { url: String, message: String },

    #[error("Front-matter parse error in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Output delivery failed: {}", failures.join(", "))]
    DeliveryFailed { failures: Vec<String> },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Whether this error means the whole run should stop rather than skip
    /// the current item.
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, AppError::SlackTokenExpired(_))
    }
}

impl RetryableError for AppError {
    fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            AppError::NetworkFailure(err) if err.is_timeout() => Some(TransientKind::Timeout),
            AppError::NetworkFailure(err) if err.is_connect() => Some(TransientKind::Connection),
            AppError::NetworkFailure(_) => Some(TransientKind::Request),
            _ => None,
        }
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(err: std::fmt::Error) -> Self {
        AppError::InternalError {
            message: "Formatting error".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
