//! Minimum-spacing rate limiter for outbound synthesis requests

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between the starts of two outbound requests
///
/// The last-start timestamp is held under an async mutex for the whole
/// wait-and-record section, so two tasks can never interleave inside it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum interval between request starts
    interval: Duration,
    /// Start time of the most recent request
    last_start: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a rate limiter with the given minimum interval between requests
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Arc::new(Mutex::new(None)),
        }
    }

    /// Minimum interval between request starts
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may start, then record its start time
    ///
    /// Returns the recorded start instant. Never fails.
    pub async fn wait(&self) -> Instant {
        let mut last = self.last_start.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                let deficit = self.interval - elapsed;
                tracing::debug!(wait_ms = %deficit.as_millis(), "rate limit: delaying request");
                tokio::time::sleep(deficit).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        now
    }

    /// Start time of the most recent request, if any
    pub async fn last_start(&self) -> Option<Instant> {
        *self.last_start.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let before = Instant::now();

        limiter.wait().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_waits_for_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(2));

        let first = limiter.wait().await;
        let second = limiter.wait().await;

        assert!(second.duration_since(first) >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn only_waits_for_remaining_deficit() {
        let limiter = RateLimiter::new(Duration::from_secs(2));

        let first = limiter.wait().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let before = Instant::now();
        let second = limiter.wait().await;

        assert_eq!(second.duration_since(first), Duration::from_secs(2));
        assert_eq!(before.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_interval_passed() {
        let limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.wait().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let before = Instant::now();
        limiter.wait().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(2));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.wait().await })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_secs(2));
        }
        assert_eq!(limiter.last_start().await, starts.last().copied());
    }
}
