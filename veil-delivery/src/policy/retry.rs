//! Retry policy for delivery operations.
//!
//! Keeps the attempt budget and the delay between attempts in one place so
//! retry behavior can be tested independently of the worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::calculate_retry_delay;

/// Retry policy configuration for delivery operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts before giving up.
    ///
    /// Default: 5 attempts
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff (in milliseconds).
    ///
    /// The actual delay is calculated as: `base * 2^(attempts - 1)`.
    /// Set to `0` to retry immediately.
    ///
    /// Default: 250 milliseconds
    #[serde(default = "defaults::base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Maximum retry delay (in milliseconds).
    ///
    /// Default: 4000 milliseconds
    #[serde(default = "defaults::max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Jitter factor for randomizing retry delays.
    ///
    /// The delay is randomized within ±`retry_jitter_factor`.
    ///
    /// Default: 0.2 (±20%)
    #[serde(default = "defaults::retry_jitter_factor")]
    pub retry_jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_retry_delay_ms: defaults::base_retry_delay_ms(),
            max_retry_delay_ms: defaults::max_retry_delay_ms(),
            retry_jitter_factor: defaults::retry_jitter_factor(),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_retry_delay_ms: 0,
            max_retry_delay_ms: 0,
            retry_jitter_factor: 0.0,
        }
    }

    /// The attempt budget, never less than one.
    #[must_use]
    pub const fn attempt_budget(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Check if another attempt should be made after `attempt_count` attempts.
    #[must_use]
    pub const fn should_retry(&self, attempt_count: u32) -> bool {
        attempt_count < self.attempt_budget()
    }

    /// Get the number of remaining attempts.
    #[must_use]
    pub const fn remaining_attempts(&self, attempt_count: u32) -> u32 {
        self.attempt_budget().saturating_sub(attempt_count)
    }

    /// How long to wait after attempt number `attempt_count` (1-indexed) failed.
    #[must_use]
    pub fn retry_delay(&self, attempt_count: u32) -> Duration {
        calculate_retry_delay(
            attempt_count,
            self.base_retry_delay_ms,
            self.max_retry_delay_ms,
            self.retry_jitter_factor,
        )
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        5
    }

    pub const fn base_retry_delay_ms() -> u64 {
        250
    }

    pub const fn max_retry_delay_ms() -> u64 {
        4_000
    }

    pub const fn retry_jitter_factor() -> f64 {
        0.2 // ±20%
    }
}
