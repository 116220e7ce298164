//! The delivery worker: one message, one outbound call at a time, bounded retries.
//!
//! ```text
//! Pending ─► Sending ─┬─► Delivered
//!              ▲      ├─► PermanentlyFailed
//!              │      ├─► ExhaustedRetries
//!              └──────┴── RetryScheduled
//! ```

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};

use veil_common::{Message, audit, internal, tracing::warn};

use crate::{
    error::{DeliveryError, PermanentError},
    policy::RetryPolicy,
    transport::Transport,
};

/// Where a delivery is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending,
    RetryScheduled,
    Delivered,
    PermanentlyFailed,
    ExhaustedRetries,
}

impl DeliveryState {
    /// Terminal states end the delivery task.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::PermanentlyFailed | Self::ExhaustedRetries
        )
    }
}

impl Display for DeliveryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Sending => "Sending",
            Self::RetryScheduled => "RetryScheduled",
            Self::Delivered => "Delivered",
            Self::PermanentlyFailed => "PermanentlyFailed",
            Self::ExhaustedRetries => "ExhaustedRetries",
        })
    }
}

/// Proof that the destination accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Number of outbound calls made, including the successful one.
    pub attempts: u32,
    /// Time from the first attempt to the acknowledgement.
    pub duration: Duration,
}

/// Attempt bookkeeping for a single message, owned by its delivery task.
#[derive(Debug)]
struct DeliveryAttempt<'a> {
    delivery_id: &'a str,
    policy: &'a RetryPolicy,
    attempts_made: u32,
    state: DeliveryState,
}

impl<'a> DeliveryAttempt<'a> {
    const fn new(delivery_id: &'a str, policy: &'a RetryPolicy) -> Self {
        Self {
            delivery_id,
            policy,
            attempts_made: 0,
            state: DeliveryState::Pending,
        }
    }

    const fn remaining(&self) -> u32 {
        self.policy.remaining_attempts(self.attempts_made)
    }

    fn transition(&mut self, next: DeliveryState) {
        internal!(
            id = self.delivery_id,
            "{} -> {} (attempts made: {}, remaining: {})",
            self.state,
            next,
            self.attempts_made,
            self.remaining()
        );
        self.state = next;
    }

    /// Enter `Sending` and return the 1-based number of this attempt.
    fn begin(&mut self) -> u32 {
        self.transition(DeliveryState::Sending);
        self.attempts_made += 1;
        self.attempts_made
    }
}

/// Posts messages to the destination and classifies the outcome.
#[derive(Clone)]
pub struct DeliveryWorker {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl fmt::Debug for DeliveryWorker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryWorker")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Deliver `message`, retrying temporary failures within the attempt budget.
    ///
    /// Every terminal failure is reported through
    /// [`audit::log_delivery_failure`] together with the rendered message,
    /// so the caller only needs the result for its own bookkeeping.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Permanent`] if the destination answered with
    ///   anything but the success marker; no retry is made
    /// - [`DeliveryError::Exhausted`] if every attempt failed temporarily
    /// - [`DeliveryError::System`] for unexpected transport failures
    pub async fn deliver(
        &self,
        delivery_id: &str,
        message: &Message,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let started = Instant::now();
        let budget = self.policy.attempt_budget();
        let mut attempt = DeliveryAttempt::new(delivery_id, &self.policy);

        let outcome = loop {
            let number = attempt.begin();
            audit::log_delivery_attempt(delivery_id, number, budget);

            match self.transport.post(&message.body()).await {
                Ok(response) if response.is_accepted() => {
                    attempt.transition(DeliveryState::Delivered);
                    break Ok(DeliveryReceipt {
                        attempts: number,
                        duration: started.elapsed(),
                    });
                }
                Ok(response) => {
                    attempt.transition(DeliveryState::PermanentlyFailed);
                    break Err(PermanentError::Rejected {
                        status: response.status,
                        body: response.body,
                    }
                    .into());
                }
                Err(DeliveryError::Temporary(error)) => {
                    if !self.policy.should_retry(number) {
                        attempt.transition(DeliveryState::ExhaustedRetries);
                        break Err(DeliveryError::Exhausted {
                            attempts: number,
                            last: error,
                        });
                    }

                    attempt.transition(DeliveryState::RetryScheduled);
                    let delay = self.policy.retry_delay(number);
                    warn!(
                        delivery_id = %delivery_id,
                        attempt = number,
                        remaining = attempt.remaining(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "Delivery attempt failed, retrying"
                    );

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    attempt.transition(error.terminal_state());
                    break Err(error);
                }
            }
        };

        match &outcome {
            Ok(receipt) => {
                audit::log_delivery_success(
                    delivery_id,
                    receipt.attempts,
                    receipt.duration.as_millis(),
                );
            }
            Err(error) => {
                audit::log_delivery_failure(
                    delivery_id,
                    error.kind(),
                    &error.to_string(),
                    attempt.attempts_made,
                    &message.to_string(),
                );
            }
        }

        outcome
    }
}
