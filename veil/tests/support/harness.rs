//! End-to-end test harness for veil
//!
//! Starts the real webhook server on an ephemeral port, wired to a
//! `wiremock` server standing in for the destination webhook.

use std::{net::SocketAddr, time::Duration};

use tokio::{sync::broadcast, task::JoinHandle};
use veil::webhook::WebhookServer;
use veil_common::Signal;
use veil_delivery::Dispatcher;
use wiremock::MockServer;

pub const TOKEN: &str = "s3cret";
pub const PATH: &str = "/webhook";

pub struct WebhookHarness {
    /// Address the webhook is listening on
    addr: SocketAddr,

    /// Stand-in for the destination webhook
    destination: MockServer,

    dispatcher: Dispatcher,

    server_handle: JoinHandle<anyhow::Result<()>>,

    shutdown_tx: broadcast::Sender<Signal>,

    client: reqwest::Client,
}

impl WebhookHarness {
    /// Start a relay pointed at a fresh mock destination.
    ///
    /// Retries are immediate and timeouts short so failure paths stay fast.
    pub async fn start() -> anyhow::Result<Self> {
        let destination = MockServer::start().await;

        let config = format!(
            r#"(
                webhook: (listen_address: "127.0.0.1:0", path: "{PATH}", token: "{TOKEN}"),
                delivery: (
                    url: "{}/services/hook",
                    timeouts: (connect_ms: 500, read_ms: 200, write_ms: 200),
                    retry: (max_attempts: 5, base_retry_delay_ms: 0),
                ),
            )"#,
            destination.uri()
        );
        let veil = veil::config::parse(&config, |_| None)?;

        let dispatcher = veil.dispatcher()?;
        let server = WebhookServer::bind(veil.webhook(), dispatcher.clone()).await?;
        let addr = server.local_addr()?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        let server_handle = tokio::spawn(server.serve(shutdown_rx));

        Ok(Self {
            addr,
            destination,
            dispatcher,
            server_handle,
            shutdown_tx,
            client: reqwest::Client::new(),
        })
    }

    pub const fn destination(&self) -> &MockServer {
        &self.destination
    }

    /// Post a form to the webhook, as the chat service would.
    pub async fn post(&self, fields: &[(&str, &str)]) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("http://{}{PATH}", self.addr))
            .form(fields)
            .send()
            .await
    }

    /// Wait for background deliveries to finish.
    pub async fn drain(&self) -> bool {
        self.dispatcher.drain(Duration::from_secs(10)).await
    }

    /// Stop the server and verify the destination's expectations.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        assert!(self.drain().await, "deliveries should finish");

        self.shutdown_tx.send(Signal::Shutdown)?;
        self.server_handle.await??;

        self.destination.verify().await;
        Ok(())
    }
}
