pub mod harness;

pub use harness::WebhookHarness;
