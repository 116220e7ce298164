//! veil relays anonymous messages from a chat slash-command to a webhook.
//!
//! - [`config`] finds and loads the process configuration
//! - [`webhook`] authenticates and validates inbound calls
//! - [`controller`] wires everything together and owns shutdown

pub mod config;
pub mod controller;
pub mod webhook;

pub use controller::Veil;
