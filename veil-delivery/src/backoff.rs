//! Retry delay with capped exponential backoff

use std::time::Duration;

use rand::Rng;

/// Calculate the delay before the next attempt using exponential backoff with jitter
///
/// # Formula
/// `delay = min(base * 2^(attempt - 1), max_delay) * (1 ± jitter)`
///
/// # Arguments
/// * `attempt` - The number of the attempt that just failed (1-indexed)
/// * `base_delay_ms` - Base delay in milliseconds; `0` retries immediately
/// * `max_delay_ms` - Maximum delay in milliseconds
/// * `jitter_factor` - Jitter factor (e.g., 0.2 for ±20%)
pub fn calculate_retry_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
) -> Duration {
    // Use saturating operations to prevent overflow
    let exponent = attempt.saturating_sub(1);
    let delay = if exponent >= 63 {
        max_delay_ms
    } else {
        let multiplier = 1u64 << exponent;
        base_delay_ms.saturating_mul(multiplier).min(max_delay_ms)
    };

    if delay == 0 || jitter_factor <= 0.0 {
        return Duration::from_millis(delay);
    }

    // Intentional precision loss and casting for randomization
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let jittered_delay = {
        let jitter_range = (delay as f64) * jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        ((delay as f64) + jitter).max(0.0) as u64
    };

    Duration::from_millis(jittered_delay)
}
