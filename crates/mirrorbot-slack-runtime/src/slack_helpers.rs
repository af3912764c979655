//! Retry policy and text helpers for the Slack Web API client.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

const MAX_BACKOFF_EXPONENT: usize = 6;
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
const ERROR_EXCERPT_CHARS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bounded retry schedule for Slack Web API calls.
///
/// Attempts are counted from 1. Slack's `Retry-After` hint replaces the
/// exponential backoff but is capped at one minute.
pub(crate) struct SlackRetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl SlackRetryPolicy {
    pub(crate) fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms.max(1)),
        }
    }

    fn has_attempts_left(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    pub(crate) fn retries_status(&self, attempt: usize, status: StatusCode) -> bool {
        self.has_attempts_left(attempt)
            && (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
    }

    pub(crate) fn retries_transport(&self, attempt: usize, error: &reqwest::Error) -> bool {
        self.has_attempts_left(attempt)
            && (error.is_timeout() || error.is_connect() || error.is_request() || error.is_body())
    }

    pub(crate) fn delay_before_retry(
        &self,
        attempt: usize,
        retry_after: Option<Duration>,
    ) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(MAX_RETRY_AFTER);
        }
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT) as u32;
        self.base_delay.saturating_mul(1_u32 << exponent)
    }
}

/// Reads Slack's `Retry-After` header, which carries whole seconds.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

/// Shortens an upstream error body for inclusion in an error message.
pub(crate) fn error_excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(ERROR_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
