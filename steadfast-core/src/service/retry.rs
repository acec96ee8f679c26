use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::{sleep, Duration};

use crate::error::{Error, Result};

/// Backoff for idempotent control calls (session open, interrupt, close).
///
/// Queries never go through this: resending one would submit the work twice.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 3_000,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u64 << (attempt as u32).min(12);
        let delay = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms.max(self.base_delay_ms));
        Duration::from_millis(delay)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

pub async fn send_with_retry(
    builder: RequestBuilder,
    policy: &RetryPolicy,
    operation: &str,
) -> Result<Response> {
    let total_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let request = builder.try_clone().ok_or_else(|| {
            Error::Transport(format!("{operation} request body cannot be replayed"))
        })?;
        let last_attempt = attempt + 1 >= total_attempts;

        match request.send().await {
            Ok(resp) if is_retryable_status(resp.status()) && !last_attempt => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    status = %resp.status(),
                    attempt,
                    total_attempts,
                    delay_ms = delay.as_millis(),
                    "retrying service call after retryable HTTP status"
                );
                sleep(delay).await;
            }
            Ok(resp) => return Ok(resp),
            Err(err) if is_retryable_error(&err) && !last_attempt => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    error = %err,
                    attempt,
                    total_attempts,
                    delay_ms = delay.as_millis(),
                    "retrying service call after transport error"
                );
                sleep(delay).await;
            }
            Err(err) => {
                return Err(Error::Transport(format!("{operation} failed: {err}")));
            }
        }

        attempt += 1;
    }
}
