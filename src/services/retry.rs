use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::error::AppResult;

/// Bounded exponential backoff for outbound calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Geocoding and places calls: 3 attempts, 1s..6s
    pub const MAPS: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        min_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(6),
    };

    /// Candidate generation: 2 attempts, 1s..4s
    pub const LLM: RetryPolicy = RetryPolicy {
        max_attempts: 2,
        min_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(4),
    };

    /// Single attempt, used by tests
    pub const NONE: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Delay before retry number `attempt` (1-based), jitter included
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .min_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        let jitter_cap = self.min_delay.as_millis() as u64 / 4;
        let jitter = if jitter_cap == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_cap))
        };
        (base + jitter).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &'static str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        error = %err,
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient upstream failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
