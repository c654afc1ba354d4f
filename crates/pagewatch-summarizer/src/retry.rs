//! Bounded retry for rate-limited summarizer calls.
//!
//! [`retry_with_backoff`] only retries [`SummarizerError::RateLimited`]. Every
//! other error, including an overloaded service, is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SummarizerError;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Fallback delay before the first retry; doubled for each later one.
    pub base_delay: Duration,
    /// Ceiling for any single delay, including server-suggested ones.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// A server-suggested delay wins when present; otherwise the fallback is
    /// `base_delay * 2^(attempt - 1)`. Both are capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        let delay = suggested.unwrap_or_else(|| {
            let exp = attempt.saturating_sub(1).min(16);
            self.base_delay.saturating_mul(1u32 << exp)
        });
        delay.min(self.max_delay)
    }
}

pub(crate) fn is_retriable(err: &SummarizerError) -> bool {
    matches!(err, SummarizerError::RateLimited { .. })
}

/// Runs `operation`, retrying rate-limit failures up to `policy.max_retries` times.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-retriable error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, SummarizerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SummarizerError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let suggested = match &err {
                    SummarizerError::RateLimited { retry_after } => *retry_after,
                    _ => None,
                };
                let delay = policy.delay_for(attempt, suggested);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "summarizer rate limited, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
