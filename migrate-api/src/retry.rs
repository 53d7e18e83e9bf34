use std::time::Duration;

use rand::Rng;

/// Per API call: up to 3 attempts, exponential backoff with base 1s, jitter
/// enabled.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Exponential backoff with base `base_delay`, doubling per attempt and
/// capped at 6 doublings, plus up to 25% jitter.
pub fn backoff(attempt: u32, base_delay: Duration) -> Duration {
    let exponent = attempt.min(6);
    let scaled = base_delay.saturating_mul(1u32 << exponent);
    let jitter_fraction: f64 = rand::rng().random_range(0.0..0.25);
    scaled.mul_f64(1.0 + jitter_fraction)
}
