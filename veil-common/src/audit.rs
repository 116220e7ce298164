//! Audit logging for message lifecycle events
//!
//! This is the operator-facing channel: everything an operator needs to
//! diagnose an undeliverable message is emitted here as structured events.
//!
//! ## Audit Events
//!
//! - `MessageAccepted`: Message passed validation and was handed to the dispatcher
//! - `MessageRejected`: Message failed validation (expected, never an error)
//! - `DeliveryAttempt`: Outbound call to the destination
//! - `DeliverySuccess`: Destination acknowledged the message
//! - `DeliveryFailure`: Destination rejected the message, or retries ran out
//! - `DeliveryDropped`: Dispatcher refused the message because it was full
//!
//! Failure and drop events are always emitted, even with auditing disabled,
//! and carry the rendered message in their `content` field so it is not
//! lost. `message` is left to the event text.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

const REDACTED: &str = "[REDACTED]";

/// Audit logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emit lifecycle events (accepted, rejected, attempt, success)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replace message content in failure reports with `[REDACTED]`
    #[serde(default)]
    pub redact_message_content: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_message_content: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Global audit configuration (thread-safe)
static AUDIT_CONFIG: OnceLock<Arc<AuditConfig>> = OnceLock::new();

/// Initialize audit logging with configuration
pub fn init(config: AuditConfig) {
    AUDIT_CONFIG.get_or_init(|| Arc::new(config));
}

/// Get the current audit configuration
#[must_use]
pub fn config() -> Arc<AuditConfig> {
    AUDIT_CONFIG
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(AuditConfig::default()))
}

/// Redact message content if redaction is enabled
#[must_use]
pub fn redact_content(content: &str, redact: bool) -> &str {
    if redact { REDACTED } else { content }
}

/// Log message accepted event
///
/// # Fields
/// - `delivery_id`: Identifier assigned by the dispatcher
/// - `channel`: Target channel, or `default`
/// - `length`: Length of the message text in bytes
pub fn log_message_accepted(delivery_id: &str, channel: Option<&str>, length: usize) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "MessageAccepted",
        delivery_id = %delivery_id,
        channel = %channel.unwrap_or("default"),
        length = length,
        "Audit: Message accepted for delivery"
    );
}

/// Log message rejected event
///
/// # Fields
/// - `rules`: Keys of the violated rules
pub fn log_message_rejected(rules: &[&str]) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "MessageRejected",
        rules = ?rules,
        "Audit: Message rejected by validation"
    );
}

/// Log delivery attempt event
///
/// # Fields
/// - `delivery_id`: Identifier assigned by the dispatcher
/// - `delivery_attempt`: Attempt number (1-based)
/// - `max_attempts`: Attempt budget for this message
pub fn log_delivery_attempt(delivery_id: &str, attempt: u32, max_attempts: u32) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "DeliveryAttempt",
        delivery_id = %delivery_id,
        delivery_attempt = attempt,
        max_attempts = max_attempts,
        "Audit: Delivery attempt"
    );
}

/// Log delivery success event
///
/// # Fields
/// - `delivery_id`: Identifier assigned by the dispatcher
/// - `delivery_attempt`: Final attempt number
/// - `duration_ms`: Total delivery duration in milliseconds
pub fn log_delivery_success(delivery_id: &str, attempt: u32, duration_ms: u128) {
    let config = config();
    if !config.enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "DeliverySuccess",
        delivery_id = %delivery_id,
        delivery_attempt = attempt,
        duration_ms = duration_ms,
        "Audit: Delivery successful"
    );
}

/// Log delivery failure event
///
/// Logged once per message when it reaches a terminal failure state.
///
/// # Fields
/// - `delivery_id`: Identifier assigned by the dispatcher
/// - `kind`: Failure kind (`permanent`, `exhausted` or `system`)
/// - `error`: Error description
/// - `delivery_attempt`: Final attempt number
/// - `content`: Rendered message (`#channel: text`), redacted if configured
pub fn log_delivery_failure(
    delivery_id: &str,
    kind: &str,
    error: &str,
    attempt: u32,
    message: &str,
) {
    let config = config();

    tracing::event!(
        tracing::Level::ERROR,
        event = "DeliveryFailure",
        delivery_id = %delivery_id,
        kind = %kind,
        error = %error,
        delivery_attempt = attempt,
        content = %redact_content(message, config.redact_message_content),
        "Audit: Delivery failed"
    );
}

/// Log delivery dropped event
///
/// # Fields
/// - `delivery_id`: Identifier assigned by the dispatcher
/// - `pending`: Number of deliveries in flight when the message was refused
/// - `content`: Rendered message, redacted if configured
pub fn log_delivery_dropped(delivery_id: &str, pending: usize, message: &str) {
    let config = config();

    tracing::event!(
        tracing::Level::ERROR,
        event = "DeliveryDropped",
        delivery_id = %delivery_id,
        pending = pending,
        content = %redact_content(message, config.redact_message_content),
        "Audit: Delivery dropped, dispatcher is full"
    );
}
