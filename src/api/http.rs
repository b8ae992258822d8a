//! HTTP transport with bounded retries on transient server errors.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use crate::error::ApiError;

/// Server statuses that are worth another attempt.
const RETRY_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Retry policy for a single call. Every call gets its own full budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each following retry.
    pub backoff_factor: Duration,
    /// Upper bound on a single backoff delay.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: Duration::from_millis(100),
            backoff_max: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Whether a response with `status` should be retried.
    pub fn should_retry(&self, status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_max)
    }
}

/// Final answer of a POST after retries.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
    /// Number of attempts it took to get this reply.
    pub attempts: u32,
}

/// A `reqwest` client that retries 500/502/503/504 with exponential backoff.
///
/// Connection-level failures and timeouts are not retried; 2xx and 4xx
/// replies return immediately.
#[derive(Debug, Clone)]
pub struct RetryingHttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingHttpClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POST `payload` as JSON to `url`; `timeout` applies to each attempt.
    pub async fn post(
        &self,
        url: &str,
        payload: &serde_json::Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpReply, ApiError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self
                .client
                .post(url)
                .headers(headers.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| ApiError::RemoteUnavailable {
                    endpoint: url.to_string(),
                    status: None,
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if self.policy.should_retry(status) {
                if attempt >= max_attempts {
                    return Err(ApiError::RemoteUnavailable {
                        endpoint: url.to_string(),
                        status: Some(status.as_u16()),
                        reason: format!("gave up after {attempt} attempts"),
                    });
                }
                let delay = self.policy.backoff_for(attempt);
                tracing::warn!(
                    endpoint = %url,
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient API failure, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| ApiError::RemoteUnavailable {
                    endpoint: url.to_string(),
                    status: Some(status.as_u16()),
                    reason: format!("failed to read body: {e}"),
                })?;

            return Ok(HttpReply {
                status,
                body,
                attempts: attempt,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_only_transient_server_errors() {
        let policy = RetryPolicy::default();
        for code in [500, 502, 503, 504] {
            assert!(policy.should_retry(StatusCode::from_u16(code).unwrap()));
        }
        for code in [200, 400, 401, 404, 501] {
            assert!(!policy.should_retry(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn backoff_starts_at_factor_and_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(800));
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let policy = RetryPolicy {
            backoff_max: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        let delays: Vec<Duration> = (1..=40).map(|a| policy.backoff_for(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(1));
    }
}
