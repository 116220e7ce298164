//! Fire-and-forget hand-off from the webhook handler to delivery tasks.
//!
//! Each accepted message gets its own task so the caller never waits on the
//! destination. Concurrency and backlog can be bounded through
//! [`DispatcherConfig`]; when the backlog is full new messages are refused
//! rather than queued.

use std::{
    fmt::{self, Display, Formatter},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::Semaphore;
use ulid::Ulid;
use veil_common::{
    Message, audit, internal,
    tracing::{debug, warn},
};

use crate::worker::DeliveryWorker;

/// Identifier attached to every submitted message, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryId(Ulid);

impl DeliveryId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DeliveryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on simultaneous outbound calls. Unbounded when `None`.
    pub max_concurrent: Option<usize>,

    /// Upper bound on deliveries in flight, waiting or sending.
    /// Submissions beyond it are refused. Unbounded when `None`.
    pub max_pending: Option<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Dispatcher is full ({pending} deliveries pending)")]
    Full { pending: usize },
}

/// Decrements the in-flight counter when a delivery task ends, however it ends.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    worker: Arc<DeliveryWorker>,
    permits: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
    max_pending: Option<usize>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(worker: DeliveryWorker, config: &DispatcherConfig) -> Self {
        Self {
            worker: Arc::new(worker),
            permits: config
                .max_concurrent
                .map(|permits| Arc::new(Semaphore::new(permits.max(1)))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_pending: config.max_pending,
        }
    }

    /// Number of deliveries that have not reached a terminal state.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start delivering `message` in the background and return immediately.
    ///
    /// Must be called from within a Tokio runtime. The outcome of the
    /// delivery is only observable through the audit log.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Full`] if `max_pending` deliveries are
    /// already in flight. The message is dropped and the drop is audited.
    pub fn submit(&self, message: Message) -> Result<DeliveryId, DispatchError> {
        let id = DeliveryId::new();

        let reserved = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                match self.max_pending {
                    Some(max) if pending >= max => None,
                    _ => Some(pending + 1),
                }
            });

        if let Err(pending) = reserved {
            audit::log_delivery_dropped(&id.to_string(), pending, &message.to_string());
            return Err(DispatchError::Full { pending });
        }

        let guard = InFlight(Arc::clone(&self.in_flight));
        let worker = Arc::clone(&self.worker);
        let permits = self.permits.clone();

        audit::log_message_accepted(&id.to_string(), message.channel(), message.text().len());

        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits {
                Some(permits) => permits.acquire_owned().await.ok(),
                None => None,
            };

            let delivery_id = id.to_string();
            match worker.deliver(&delivery_id, &message).await {
                Ok(receipt) => {
                    internal!(level = DEBUG, id = delivery_id, "Delivery task finished after {} attempts", receipt.attempts);
                }
                Err(error) => {
                    internal!(level = DEBUG, id = delivery_id, "Delivery task failed: {error}");
                }
            }
        });

        Ok(id)
    }

    /// Wait up to `timeout` for in-flight deliveries to finish.
    ///
    /// Returns `true` if nothing is left in flight.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        while self.in_flight() > 0 {
            if start.elapsed() >= timeout {
                warn!(
                    "Shutdown timeout exceeded, abandoning {} in-flight deliveries",
                    self.in_flight()
                );
                return false;
            }

            debug!(
                "Waiting for {} in-flight deliveries to complete ({:.1}s elapsed)...",
                self.in_flight(),
                start.elapsed().as_secs_f64()
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        internal!("All in-flight deliveries completed");
        true
    }
}
