//! Timeout configuration for calls to the delivery destination.
//!
//! Each phase of an outbound call is bounded separately. A phase that runs
//! past its bound counts as a transient failure and the delivery is retried.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outbound HTTP timeout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTimeouts {
    /// Timeout for establishing the connection.
    ///
    /// Default: 5000 milliseconds
    #[serde(default = "defaults::connect_ms")]
    pub connect_ms: u64,

    /// Timeout between reads of the response.
    ///
    /// Default: 10000 milliseconds
    #[serde(default = "defaults::read_ms")]
    pub read_ms: u64,

    /// Budget for writing the request.
    ///
    /// Default: 2000 milliseconds
    #[serde(default = "defaults::write_ms")]
    pub write_ms: u64,
}

impl Default for DeliveryTimeouts {
    fn default() -> Self {
        Self {
            connect_ms: defaults::connect_ms(),
            read_ms: defaults::read_ms(),
            write_ms: defaults::write_ms(),
        }
    }
}

impl DeliveryTimeouts {
    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    #[must_use]
    pub const fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    #[must_use]
    pub const fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }

    /// Upper bound for a whole request: every phase back to back.
    #[must_use]
    pub const fn total(&self) -> Duration {
        self.connect()
            .saturating_add(self.read())
            .saturating_add(self.write())
    }
}

mod defaults {
    pub const fn connect_ms() -> u64 {
        5_000
    }

    pub const fn read_ms() -> u64 {
        10_000
    }

    pub const fn write_ms() -> u64 {
        2_000
    }
}
