//! Retry policy for Slack Web API calls.
//!
//! Slack signals throttling two ways: an HTTP 429 with `Retry-After`, and a
//! 200 response whose body is `{"ok": false, "error": "ratelimited"}`. Both
//! are retried here, along with gateway failures and connect/timeout errors.

use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use sweep_core::clip_text;
use sweep_engine::SlackErrorKind;

pub(super) const RETRY_ATTEMPT_HEADER: &str = "x-sweep-retry-attempt";

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
const MAX_BACKOFF_DOUBLINGS: u32 = 5;
const ERROR_BODY_CHARS: usize = 800;

/// Outcome of one attempt that did not produce a usable response.
#[derive(Debug)]
pub(super) enum RetrySignal {
    Status {
        status: u16,
        retry_after: Option<Duration>,
        body: String,
    },
    RateLimited {
        retry_after: Option<Duration>,
        body: Value,
    },
    Transport(reqwest::Error),
}

impl RetrySignal {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::RateLimited { .. } => true,
            Self::Transport(error) => error.is_timeout() || error.is_connect(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } | Self::RateLimited { retry_after, .. } => {
                *retry_after
            }
            Self::Transport(_) => None,
        }
    }

    pub(super) fn label(&self) -> &'static str {
        match self {
            Self::Status { .. } => "http_status",
            Self::RateLimited { .. } => "ratelimited",
            Self::Transport(_) => "transport",
        }
    }

    /// Final error once retries are exhausted or the failure is not retryable.
    /// Callers handle `RateLimited` themselves so the code reaches `SlackErrorKind`.
    pub(super) fn into_error(self, operation: &str) -> anyhow::Error {
        match self {
            Self::Status { status, body, .. } => anyhow!(
                "slack api {operation} failed with status {status}: {}",
                clip_text(&body, ERROR_BODY_CHARS)
            ),
            Self::RateLimited { .. } => anyhow!("slack api {operation} stayed rate limited"),
            Self::Transport(error) => {
                anyhow::Error::new(error).context(format!("slack api {operation} request failed"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SlackRetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl SlackRetryPolicy {
    pub(super) fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms.max(1)),
        }
    }

    /// Pause before the attempt following `attempt` (1-based), or `None` when
    /// the caller should give up.
    pub(super) fn delay_after(&self, attempt: usize, signal: &RetrySignal) -> Option<Duration> {
        if attempt >= self.max_attempts || !signal.is_retryable() {
            return None;
        }
        Some(match signal.retry_after() {
            Some(hint) => hint.min(MAX_RETRY_AFTER),
            None => self.backoff(attempt),
        })
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let doublings = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX)
            .min(MAX_BACKOFF_DOUBLINGS);
        self.base_delay.saturating_mul(1_u32 << doublings)
    }
}

pub(super) fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// True for a 200 body carrying Slack's `ratelimited` error code.
pub(super) fn is_rate_limited_body(body: &Value) -> bool {
    body.get("ok").and_then(Value::as_bool) == Some(false)
        && body
            .get("error")
            .and_then(Value::as_str)
            .map(SlackErrorKind::from_code)
            == Some(SlackErrorKind::Ratelimited)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use serde_json::json;

    use super::{is_rate_limited_body, retry_after_hint, RetrySignal, SlackRetryPolicy};

    fn status(status: u16, retry_after: Option<Duration>) -> RetrySignal {
        RetrySignal::Status {
            status,
            retry_after,
            body: String::new(),
        }
    }

    #[test]
    fn unit_delay_after_doubles_base_delay_and_caps_growth() {
        let policy = SlackRetryPolicy::new(20, 100);
        let signal = status(503, None);
        assert_eq!(policy.delay_after(1, &signal), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(2, &signal), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_after(4, &signal), Some(Duration::from_millis(800)));
        assert_eq!(policy.delay_after(6, &signal), Some(Duration::from_millis(3_200)));
        assert_eq!(policy.delay_after(12, &signal), Some(Duration::from_millis(3_200)));
    }

    #[test]
    fn unit_delay_after_prefers_retry_after_hint_with_ceiling() {
        let policy = SlackRetryPolicy::new(5, 100);
        assert_eq!(
            policy.delay_after(1, &status(429, Some(Duration::from_secs(2)))),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            policy.delay_after(1, &status(429, Some(Duration::from_secs(3_600)))),
            Some(Duration::from_secs(60))
        );
        let throttled = RetrySignal::RateLimited {
            retry_after: Some(Duration::ZERO),
            body: json!({"ok": false, "error": "ratelimited"}),
        };
        assert_eq!(policy.delay_after(1, &throttled), Some(Duration::ZERO));
    }

    #[test]
    fn regression_delay_after_stops_on_final_attempt_and_client_errors() {
        let policy = SlackRetryPolicy::new(3, 10);
        assert_eq!(policy.delay_after(3, &status(429, None)), None);
        for code in [400_u16, 401, 403, 404, 501] {
            assert_eq!(policy.delay_after(1, &status(code, None)), None, "status {code}");
        }
        assert_eq!(SlackRetryPolicy::new(0, 0).delay_after(1, &status(503, None)), None);
    }

    #[test]
    fn unit_retry_after_hint_reads_whole_seconds_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_hint(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_hint(&headers), None);
    }

    #[test]
    fn unit_is_rate_limited_body_matches_only_failed_ratelimited_bodies() {
        assert!(is_rate_limited_body(&json!({"ok": false, "error": "ratelimited"})));
        assert!(!is_rate_limited_body(&json!({"ok": false, "error": "cant_delete_message"})));
        assert!(!is_rate_limited_body(&json!({"ok": true, "error": "ratelimited"})));
        assert!(!is_rate_limited_body(&json!({"ok": false})));
    }

    #[test]
    fn unit_into_error_clips_long_status_bodies() {
        let error = RetrySignal::Status {
            status: 500,
            retry_after: None,
            body: "x".repeat(2_000),
        }
        .into_error("chat.delete");
        let rendered = error.to_string();
        assert!(rendered.starts_with("slack api chat.delete failed with status 500: "));
        assert!(rendered.ends_with("..."));
        assert!(rendered.len() < 900);
    }
}
