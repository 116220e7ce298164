//! Configuration types shared across veil crates.
//!
//! - [`timeouts`]: outbound delivery timeouts

pub mod timeouts;

pub use timeouts::DeliveryTimeouts;
