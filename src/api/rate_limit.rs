// src/api/rate_limit.rs
//! Minimum-interval rate limiting for calls to one external resource.

use crate::types::ValidationError;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum wall-clock interval between permitted calls.
///
/// One limiter is built per resource class (e.g. Slack history vs. user
/// lookups) and shared by every caller of that resource. The sleep happens
/// while the lock is held, so concurrent callers are serialized and the
/// aggregate rate never exceeds the configured one.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(calls_per_second: f64) -> Result<Self, ValidationError> {
        if !calls_per_second.is_finite() || calls_per_second <= 0.0 {
            return Err(ValidationError::InvalidRate(calls_per_second));
        }
        Ok(Self {
            min_interval: Duration::from_secs_f64(1.0 / calls_per_second),
            last_call: Mutex::new(None),
        })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn calls_per_second(&self) -> f64 {
        1.0 / self.min_interval.as_secs_f64()
    }

    /// Blocks until the next call is allowed, then records it.
    pub fn wait(&self) {
        let mut last_call = self.last_call.lock();
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last_call = Some(Instant::now());
    }
}
