use std::time::Duration;
use tokio::time::sleep;

/// Spaces out page requests so the API's implicit rate limit is respected.
///
/// The first call returns immediately; every later call sleeps for the
/// configured delay.
pub struct RateLimiter {
    delay: Duration,
    request_count: usize,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            request_count: 0,
        }
    }

    pub async fn wait(&mut self) {
        if self.should_wait() {
            sleep(self.delay).await;
        }
        self.request_count += 1;
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    fn should_wait(&self) -> bool {
        self.request_count > 0 && !self.delay.is_zero()
    }
}

/// Exponential retry delays: `factor * 2^(retry - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    factor: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(factor: Duration, max: Duration) -> Self {
        Self { factor, max }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.factor
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }
}
