//! Policy abstractions for delivery operations.
//!
//! - [`RetryPolicy`]: Determines how many attempts a message gets and how
//!   long to wait between them

pub mod retry;

pub use retry::RetryPolicy;
