use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use roomstore_core::StoreError;
use tracing::warn;

/// Bounded exponential backoff for rate-limited (429) and server-error (5xx)
/// responses. Transport errors are not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Send every request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Send a request, rebuilding and resending it while the response is
    /// retryable. Once retries are exhausted the last response is returned
    /// for the caller to map.
    pub async fn send(
        &self,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response, StoreError> {
        let mut attempt = 0;
        loop {
            let response = build_request()
                .send()
                .await
                .map_err(|e| StoreError::Transport(format!("GitHub request failed: {}", e)))?;

            let status = response.status();
            if !Self::should_retry(status) || attempt >= self.max_retries {
                return Ok(response);
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempt + 1,
                status = status.as_u16(),
                delay_ms = delay.as_millis() as u64,
                "GitHub request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(RetryPolicy::should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(RetryPolicy::should_retry(StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::should_retry(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!RetryPolicy::should_retry(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::should_retry(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(!RetryPolicy::should_retry(StatusCode::FORBIDDEN));
    }
}
