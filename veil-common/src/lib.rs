//! Shared building blocks for the veil relay.
//!
//! - [`validation`] turns untrusted webhook parameters into a [`Message`]
//!   or a set of [`Rejections`]
//! - [`rejection`] renders rejections into the ephemeral reply body
//! - [`logging`] and [`audit`] carry the diagnostic and operator channels

pub mod audit;
pub mod config;
pub mod logging;
pub mod message;
pub mod rejection;
pub mod validation;

pub use message::{Message, MessageBody};
pub use rejection::{Attachment, RejectionResponse};
pub use tracing;
pub use validation::{Rejections, Rule, ValidationOutcome, validate};

/// Broadcast to every long-running task when the relay starts to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
