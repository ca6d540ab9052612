//! Bounded retry loop with linear backoff.
//!
//! Each iteration runs one attempt and classifies it as an
//! [`AttemptOutcome`]. Retryable failures sleep `base_delay × k` after
//! attempt `k` and try again, until `max_attempts` attempts have run.
//! Attempts never overlap: attempt `k + 1` starts only after attempt `k`
//! has failed and its delay has elapsed.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;

/// Retry budget for a single logical call.
///
/// Every call gets its own budget; concurrent calls do not share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Multiplied by the attempt number to get the delay before the next one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Classification of one attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Transport failure, timeout or 5xx.
    Retryable(Error),
    /// 4xx or any non-transient failure. Ends the loop immediately.
    Terminal(Error),
}

impl<T> From<Result<T, Error>> for AttemptOutcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) if e.is_transient() => Self::Retryable(e),
            Err(e) => Self::Terminal(e),
        }
    }
}

/// Run `attempt` until it succeeds, fails terminally, or the budget is spent.
///
/// The closure receives the 1-based attempt number. On exhaustion the
/// result is [`Error::MaxRetriesExceeded`] carrying the last failure's message.
pub async fn run<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let max = policy.attempts();
    let mut n: u32 = 1;

    loop {
        match AttemptOutcome::from(attempt(n).await) {
            AttemptOutcome::Success(value) => return Ok(value),
            AttemptOutcome::Terminal(e) => {
                debug!(attempt = n, error = %e, "request failed, not retrying");
                return Err(e);
            }
            AttemptOutcome::Retryable(e) if n >= max => {
                warn!(attempts = n, error = %e, "request failed, retries exhausted");
                return Err(Error::MaxRetriesExceeded {
                    attempts: n,
                    message: e.message(),
                });
            }
            AttemptOutcome::Retryable(e) => {
                let delay = policy.delay_after(n);
                warn!(
                    attempt = n,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                n += 1;
            }
        }
    }
}
