// src/api/client.rs
//! Blocking HTTP client shared by every fetch job.
//!
//! This module wraps `reqwest::blocking::Client` with authentication,
//! rate limiting and retry. It returns raw bodies with status metadata and
//! leaves parsing to the callers.

use super::rate_limit::RateLimiter;
use super::retry::{RetryPolicy, StatusSignal};
use crate::constants::{ERROR_BODY_PREVIEW_LENGTH, HTTP_TIMEOUT};
use crate::error::AppError;
use crate::types::{ApiToken, BaseUrl};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// How requests authenticate against the remote API.
#[derive(Debug, Clone)]
pub enum Auth {
    /// HTTP basic auth, e.g. Jira email + API token.
    Basic { user: String, token: ApiToken },
    /// `Authorization: Bearer <token>`.
    Bearer(ApiToken),
    /// Credentials travel inside the request (Slack form token) or none.
    None,
}

/// Request payload variants supported by the jobs.
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    Empty,
    Json(&'a Value),
    Form(&'a [(&'a str, String)]),
}

/// A thin wrapper around the blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Option<BaseUrl>,
    auth: Auth,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client with the given default headers.
    ///
    /// Endpoints passed to the request methods are joined onto `base`;
    /// absolute `http(s)://` URLs are used as-is.
    pub fn new(
        base: Option<BaseUrl>,
        auth: Auth,
        default_headers: header::HeaderMap,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("context-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base,
            auth,
            retry,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Makes a GET request, waiting on `limiter` before every attempt.
    pub fn get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        limiter: &RateLimiter,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.resolve(endpoint)?;
        log::debug!("GET {}", url);
        self.send_with_retry(limiter, || {
            self.build(Method::GET, &url, Body::Empty).query(query)
        })
    }

    /// Makes a POST request with a JSON body.
    pub fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        limiter: &RateLimiter,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.resolve(endpoint)?;
        log::debug!("POST {}", url);
        self.send_with_retry(limiter, || self.build(Method::POST, &url, Body::Json(body)))
    }

    /// Makes a form-encoded POST request.
    pub fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, String)],
        limiter: &RateLimiter,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.resolve(endpoint)?;
        log::debug!("POST {}", url);
        self.send_with_retry(limiter, || self.build(Method::POST, &url, Body::Form(form)))
    }

    /// Makes a single form-encoded POST attempt without retrying.
    ///
    /// For APIs that signal throttling in the body; the caller wraps this in
    /// its own [`RetryPolicy::execute`].
    pub fn post_form_once(
        &self,
        endpoint: &str,
        form: &[(&str, String)],
        limiter: &RateLimiter,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.resolve(endpoint)?;
        log::debug!("POST {}", url);
        limiter.wait();
        let response = self.build(Method::POST, &url, Body::Form(form)).send()?;
        read_body(response)
    }

    fn send_with_retry<F>(&self, limiter: &RateLimiter, request: F) -> Result<ApiResponse<String>, AppError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry.execute(|| {
            limiter.wait();
            let response = request().send()?;
            read_body(response)
        })
    }

    fn build(&self, method: Method, url: &str, body: Body<'_>) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        request = match &self.auth {
            Auth::Basic { user, token } => request.basic_auth(user, Some(token.as_str())),
            Auth::Bearer(token) => request.bearer_auth(token.as_str()),
            Auth::None => request,
        };
        match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Form(fields) => request.form(fields),
        }
    }

    fn resolve(&self, endpoint: &str) -> Result<String, AppError> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint.to_string());
        }
        self.base
            .as_ref()
            .map(|base| base.join(endpoint))
            .ok_or_else(|| {
                AppError::MissingConfiguration(format!(
                    "no base URL configured for relative endpoint '{}'",
                    endpoint
                ))
            })
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
    pub retry_after: Option<String>,
}

impl ApiResponse<String> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserializes the body, attributing failures to the request URL.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_str(&self.data).map_err(|e| {
            AppError::MalformedResponse(format!("{} returned invalid JSON: {}", self.url, e))
        })
    }

    /// Turns a non-2xx response into [`AppError::HttpStatus`].
    pub fn error_for_status(self) -> Result<Self, AppError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AppError::HttpStatus {
                endpoint: self.url.clone(),
                status: self.status.as_u16(),
                body_preview: self.body_preview(),
            })
        }
    }

    pub fn body_preview(&self) -> String {
        self.data.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect()
    }
}

impl<T> StatusSignal for ApiResponse<T> {
    fn status_code(&self) -> Option<u16> {
        Some(self.status.as_u16())
    }

    fn retry_hint(&self) -> Option<String> {
        self.retry_after.clone()
    }
}

/// Reads the response body as text along with status and URL metadata.
pub fn read_body(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let retry_after = response.retry_hint();
    let text = response.text()?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
        retry_after,
    })
}
