use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid issue key: {0}")]
    InvalidIssueKey(String),

    #[error("Invalid issue key prefix: {0}")]
    InvalidKeyPrefix(String),

    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid API token: {reason}")]
    InvalidToken { reason: String },

    #[error("Invalid rate: {0} calls per second (must be a positive finite number)")]
    InvalidRate(f64),

    #[error("Invalid backoff multiplier: {0} (must be a positive finite number)")]
    InvalidBackoff(f64),
}
