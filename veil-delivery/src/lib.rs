//! Background delivery of validated messages to the destination webhook
//!
//! This crate provides functionality to:
//! - Hand messages off to background tasks without blocking the caller
//! - Post each message to the destination with a bounded retry budget
//! - Classify outcomes as delivered, permanently failed, or out of retries

mod backoff;
mod dispatcher;
mod error;
pub mod policy;
mod transport;
mod worker;

pub use dispatcher::{DeliveryId, DispatchError, Dispatcher, DispatcherConfig};
pub use error::{DeliveryError, PermanentError, SystemError, TemporaryError};
pub use policy::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportResponse, SUCCESS_BODY};
pub use worker::{DeliveryReceipt, DeliveryState, DeliveryWorker};
