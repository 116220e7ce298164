use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use serde::Deserialize;
use tokio::sync::broadcast;
use veil_common::{Signal, audit, audit::AuditConfig, internal, logging, tracing};
use veil_delivery::{DeliveryWorker, Dispatcher, HttpTransport};

use crate::{
    config::{DeliveryConfig, WebhookConfig},
    webhook::WebhookServer,
};

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// The whole relay, as described by its configuration file.
#[derive(Debug, Deserialize)]
pub struct Veil {
    #[serde(default)]
    pub(crate) webhook: WebhookConfig,
    #[serde(default)]
    pub(crate) delivery: DeliveryConfig,
    #[serde(default)]
    pub(crate) audit: AuditConfig,
    /// Grace period for in-flight deliveries once shutdown starts (in seconds)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub(crate) shutdown_timeout_secs: u64,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    Ok(())
}

impl Veil {
    #[must_use]
    pub const fn webhook(&self) -> &WebhookConfig {
        &self.webhook
    }

    #[must_use]
    pub const fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditConfig {
        &self.audit
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Build the dispatcher, and the HTTP delivery pipeline behind it.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination URL is invalid or the HTTP
    /// client cannot be built.
    pub fn dispatcher(&self) -> anyhow::Result<Dispatcher> {
        let transport = HttpTransport::new(self.delivery.destination()?, &self.delivery.timeouts)?;
        let worker = DeliveryWorker::new(Arc::new(transport), self.delivery.retry.clone());

        Ok(Dispatcher::new(worker, &self.delivery.dispatcher()))
    }

    /// Run the relay until SIGINT or SIGTERM.
    ///
    /// Once a signal arrives the webhook stops accepting requests, and
    /// in-flight deliveries get [`Veil::shutdown_timeout`] to finish.
    ///
    /// # Errors
    ///
    /// This function will return an error if the delivery pipeline cannot be
    /// built, the webhook cannot bind, or the server fails while running.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        audit::init(self.audit.clone());

        internal!("Controller running");

        let dispatcher = self.dispatcher()?;
        let server = WebhookServer::bind(&self.webhook, dispatcher.clone()).await?;

        let signals = tokio::spawn(async {
            if let Err(e) = shutdown().await {
                tracing::error!("Failed to wait for shutdown signal: {e}");
            }
        });

        let ret = server.serve(SHUTDOWN_BROADCAST.subscribe()).await;

        internal!("Shutting down...");
        signals.abort();

        if dispatcher.drain(self.shutdown_timeout()).await {
            internal!("Delivery drained");
        }

        ret
    }
}
