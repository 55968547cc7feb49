//! Retry policy for transient backend failures.
//!
//! Ported from the teacher's (unwired) `provider/base/retry.rs`, adapted to
//! spec.md §4.5's exact numbers: three attempts, 1 s base delay capped at
//! 30 s (the teacher caps at 16 s and has no jitter), and **full jitter**
//! rather than a flat rate-limit multiplier.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with full jitter, per spec.md §4.5.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::config::defaults::DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_ms: crate::config::defaults::DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: crate::config::defaults::DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Full-jitter delay for the given attempt number (0-based): a uniform
    /// random duration between zero and `min(base * 2^attempt, max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let cap = self.base_delay_ms.saturating_mul(1u64 << attempt.min(20));
        let upper = cap.min(self.max_delay_ms);
        let jittered = rand::thread_rng().gen_range(0..=upper);
        Duration::from_millis(jittered)
    }
}
