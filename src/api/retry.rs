// src/api/retry.rs
//! Retry with exponential backoff for transient API failures.
//!
//! Two failure channels are retried:
//! - errors whose [`TransientKind`] is in the policy's set, and
//! - successful calls whose value carries a retryable status code.
//!
//! When attempts run out the channels behave differently: the last error is
//! returned as `Err`, the last response is returned as `Ok` and the caller
//! has to inspect its status.

use crate::constants::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_ATTEMPTS, RETRYABLE_STATUS_CODES};
use crate::types::ValidationError;
use std::collections::HashSet;
use std::fmt::Display;
use std::time::Duration;

/// Classes of failure that are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientKind {
    /// The connection could not be established or was reset.
    Connection,
    /// The request timed out.
    Timeout,
    /// Any other transport-level request failure.
    Request,
}

impl TransientKind {
    pub const ALL: [TransientKind; 3] = [Self::Connection, Self::Timeout, Self::Request];
}

/// Errors that can report whether they are transient.
pub trait RetryableError {
    fn transient_kind(&self) -> Option<TransientKind>;
}

/// Values that may carry an HTTP-like status and a server retry hint.
pub trait StatusSignal {
    fn status_code(&self) -> Option<u16>;

    /// Raw `Retry-After` style hint, in seconds.
    fn retry_hint(&self) -> Option<String> {
        None
    }
}

impl StatusSignal for reqwest::blocking::Response {
    fn status_code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }

    fn retry_hint(&self) -> Option<String> {
        self.headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

/// Retry configuration applied per call. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    retryable_errors: HashSet<TransientKind>,
    retryable_statuses: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Builds a policy with the default multiplier, every transient error
    /// class and the default status set. `max_attempts` is at least one.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retryable_errors: TransientKind::ALL.into_iter().collect(),
            retryable_statuses: RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Result<Self, ValidationError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ValidationError::InvalidBackoff(multiplier));
        }
        self.backoff_multiplier = multiplier;
        Ok(self)
    }

    pub fn with_retryable_errors(mut self, kinds: impl IntoIterator<Item = TransientKind>) -> Self {
        self.retryable_errors = kinds.into_iter().collect();
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Computed delay before `attempt` (2-based): `initial × multiplier^(attempt-2)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2) as i32;
        scale(self.initial_delay, self.backoff_multiplier.powi(exponent))
    }

    /// Runs `operation`, retrying transient errors and retryable statuses.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        T: StatusSignal,
        E: RetryableError + Display,
    {
        self.execute_with(
            operation,
            |value: &T| value.status_code().map(|status| (status, value.retry_hint())),
            std::thread::sleep,
        )
    }

    /// Runs `operation`, retrying transient errors only.
    pub fn execute_fallible<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: RetryableError + Display,
    {
        self.execute_with(operation, |_: &T| None, std::thread::sleep)
    }

    /// The retry loop with the status probe and sleep made explicit.
    pub(crate) fn execute_with<T, E, F, S, Z>(
        &self,
        mut operation: F,
        status_of: S,
        mut sleep: Z,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        S: Fn(&T) -> Option<(u16, Option<String>)>,
        Z: FnMut(Duration),
        E: RetryableError + Display,
    {
        let mut attempt = 1;
        let mut delay = self.initial_delay;

        loop {
            match operation() {
                Ok(value) => {
                    let Some((status, hint)) = status_of(&value)
                        .filter(|(status, _)| self.retryable_statuses.contains(status))
                    else {
                        return Ok(value);
                    };

                    if attempt >= self.max_attempts {
                        log::warn!(
                            "Attempt {} got HTTP {}; retries exhausted",
                            attempt,
                            status
                        );
                        return Ok(value);
                    }

                    let wait = hint.as_deref().and_then(parse_retry_hint).unwrap_or(delay);
                    log::warn!(
                        "  Attempt {} got {}. Retrying in {:.1}s...",
                        attempt,
                        status,
                        wait.as_secs_f64()
                    );
                    sleep(wait);
                }
                Err(err) => {
                    let retryable = err
                        .transient_kind()
                        .is_some_and(|kind| self.retryable_errors.contains(&kind));
                    if !retryable || attempt >= self.max_attempts {
                        return Err(err);
                    }

                    log::warn!(
                        "  Attempt {} failed: {}. Retrying in {:.1}s...",
                        attempt,
                        err,
                        delay.as_secs_f64()
                    );
                    sleep(delay);
                }
            }

            delay = scale(delay, self.backoff_multiplier);
            attempt += 1;
        }
    }
}

/// Parses a `Retry-After` value given in (possibly fractional) seconds.
fn parse_retry_hint(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
