use super::ValidationError;
use std::fmt;
use url::Url;

/// A secret credential (API token, session token, cookie).
///
/// `Display` and `Debug` never print the full value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidToken {
                reason: "token cannot be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Rejects the literal placeholder shipped in sample `.env` files.
    pub fn reject_placeholder(self, placeholder: &str) -> Result<Self, ValidationError> {
        if self.0 == placeholder {
            Err(ValidationError::InvalidToken {
                reason: "token is still the placeholder value".to_string(),
            })
        } else {
            Ok(self)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "{}...", visible)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({})", self)
    }
}

/// An http(s) base URL with any trailing slash removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: input.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins an endpoint path onto the base.
    pub fn join(&self, endpoint: &str) -> String {
        format!("{}/{}", self.0, endpoint.trim_start_matches('/'))
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
