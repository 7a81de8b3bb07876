//! Retry with exponential backoff for authority HTTP calls.
//!
//! Retries only transient transport failures (connection refused, reset,
//! timed out). Responses that arrive — whatever their status — are handed
//! back to the caller, which owns the status-code policy.

use std::time::Duration;

/// Backoff policy for one logical authority call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry attempts after the initial request.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 200ms → 400ms → 800ms.
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Send an HTTP request, retrying transport failures per this policy.
    ///
    /// The closure is called up to `max_retries + 1` times. Timeouts are
    /// NOT retried here — a timed-out submit may have reached the
    /// authority, and blind resubmission is the caller's decision, made
    /// against its own recovery state.
    pub(crate) async fn send<F, Fut>(&self, f: F) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        for attempt in 0..self.max_retries {
            match f().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() => return Err(e),
                Err(e) => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "authority request failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        // Final attempt, no further retries.
        f().await
    }
}
