//! Bounded exponential backoff around a single synthesis request

use std::time::Duration;

use super::rate_limiter::RateLimiter;
use super::synthesizer::Synthesizer;
use crate::error::SynthesisFailure;

/// Retry policy for synthesis requests
///
/// Controls how many times a failed request is retried and how long to
/// wait between attempts. Delays are deterministic (no jitter): with the
/// defaults, 3 retries follow waits of 2s, 4s and 8s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: u32,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (zero-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Sum of all backoff delays when every attempt fails
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

/// Synthesize `text`, retrying failed attempts according to `policy`
///
/// Every attempt first passes through `limiter` and is bounded by
/// `timeout`. Transport failures and rejected responses share the same
/// backoff loop; the failure from the final attempt is returned.
///
/// # Errors
///
/// Returns the last classified failure once all attempts are exhausted
pub async fn fetch_with_retry<S>(
    synthesizer: &S,
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    timeout: Duration,
    text: &str,
) -> Result<Vec<u8>, SynthesisFailure>
where
    S: Synthesizer + ?Sized,
{
    let mut attempt = 0;

    loop {
        limiter.wait().await;

        let outcome = match tokio::time::timeout(timeout, synthesizer.synthesize(text)).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisFailure::Timeout(timeout)),
        };

        let failure = match outcome {
            Ok(audio) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "synthesis succeeded after retry");
                }
                return Ok(audio);
            }
            Err(failure) => failure,
        };

        if attempt >= policy.max_retries {
            tracing::warn!(
                attempts = attempt + 1,
                error = %failure,
                "synthesis failed, retries exhausted"
            );
            return Err(failure);
        }

        let delay = policy.delay_for_attempt(attempt);
        if failure.is_transport() {
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = %delay.as_millis(),
                error = %failure,
                "network error contacting speech endpoint"
            );
        } else {
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = %delay.as_millis(),
                error = %failure,
                "speech endpoint rejected request, retrying"
            );
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
