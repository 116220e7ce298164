//! Typed error handling for delivery operations.
//!
//! This module provides structured error types that distinguish between:
//! - Permanent failures (destination answered, but not with `ok`) - don't retry
//! - Temporary failures (timeouts, unreachable destination) - retry
//! - Exhausted retries (temporary failures that outlived the attempt budget)
//! - System errors - internal errors

use thiserror::Error;

use crate::worker::DeliveryState;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The destination rejected the message; retrying cannot help.
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// A single attempt failed in a way that may succeed on retry.
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// Every attempt in the budget failed temporarily.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: TemporaryError },

    /// System-level error (configuration, unexpected transport errors).
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Permanent errors that should not be retried.
#[derive(Debug, Error)]
pub enum PermanentError {
    /// The destination answered with something other than the success marker,
    /// usually a bad token or a misconfigured webhook.
    #[error("Destination rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Temporary errors that should be retried.
#[derive(Debug, Error)]
pub enum TemporaryError {
    /// Connect, write or read took longer than allowed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The destination could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// System-level errors that indicate internal problems.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport failure that is neither a timeout nor a connection failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Returns `true` if this error is temporary and should be retried.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns `true` if this error is permanent and should not be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if the retry budget ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Short name used in failure reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Permanent(_) => "permanent",
            Self::Temporary(_) => "temporary",
            Self::Exhausted { .. } => "exhausted",
            Self::System(_) => "system",
        }
    }

    /// The state a delivery moves to after failing with this error.
    ///
    /// Only [`DeliveryError::Temporary`] leads to a non-terminal state.
    #[must_use]
    pub const fn terminal_state(&self) -> DeliveryState {
        match self {
            Self::Permanent(_) | Self::System(_) => DeliveryState::PermanentlyFailed,
            Self::Temporary(_) => DeliveryState::RetryScheduled,
            Self::Exhausted { .. } => DeliveryState::ExhaustedRetries,
        }
    }
}

/// Convert from `reqwest::Error` to `DeliveryError`.
///
/// - **Timeouts** → Temporary (connect, write or read ran too long)
/// - **Connection errors** → Temporary (destination unreachable)
/// - **Builder errors** → System (bad client configuration)
/// - **Anything else** → System
impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Temporary(TemporaryError::Timeout(error.to_string()))
        } else if error.is_connect() {
            Self::Temporary(TemporaryError::ConnectionFailed(error.to_string()))
        } else if error.is_builder() {
            Self::System(SystemError::Configuration(error.to_string()))
        } else {
            Self::System(SystemError::Transport(error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_is_temporary() {
        let error = DeliveryError::Temporary(TemporaryError::Timeout("read".to_string()));
        assert!(error.is_temporary());
        assert!(!error.is_permanent());
        assert!(!error.is_exhausted());
        assert!(!error.is_system());
    }

    #[test]
    fn test_delivery_error_is_permanent() {
        let error = DeliveryError::Permanent(PermanentError::Rejected {
            status: 404,
            body: "Bad token".to_string(),
        });
        assert!(error.is_permanent());
        assert!(!error.is_temporary());
        assert_eq!(error.terminal_state(), DeliveryState::PermanentlyFailed);
        assert_eq!(error.kind(), "permanent");
    }

    #[test]
    fn test_delivery_error_is_exhausted() {
        let error = DeliveryError::Exhausted {
            attempts: 5,
            last: TemporaryError::Timeout("read".to_string()),
        };
        assert!(error.is_exhausted());
        assert!(!error.is_temporary());
        assert_eq!(error.terminal_state(), DeliveryState::ExhaustedRetries);
        assert_eq!(error.kind(), "exhausted");
    }

    #[test]
    fn test_delivery_error_is_system() {
        let error = DeliveryError::System(SystemError::Transport("decode".to_string()));
        assert!(error.is_system());
        assert_eq!(error.terminal_state(), DeliveryState::PermanentlyFailed);
    }

    #[test]
    fn test_error_display() {
        let error = DeliveryError::Permanent(PermanentError::Rejected {
            status: 404,
            body: "Bad token".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Permanent failure: Destination rejected message (404): Bad token"
        );

        let error = DeliveryError::Exhausted {
            attempts: 5,
            last: TemporaryError::ConnectionFailed("refused".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Retries exhausted after 5 attempts: Connection failed: refused"
        );
    }

    #[test]
    fn test_builder_error_is_system() {
        let error = reqwest::Client::new()
            .post("not a url")
            .build()
            .expect_err("url should not parse");

        let delivery_err: DeliveryError = error.into();
        assert!(delivery_err.is_system());
    }
}
