//! Outbound calls to the delivery destination

use async_trait::async_trait;
use url::Url;
use veil_common::{MessageBody, config::DeliveryTimeouts, outgoing};

use crate::error::{DeliveryError, SystemError};

/// The only response body the destination sends for an accepted message.
pub const SUCCESS_BODY: &str = "ok";

/// What the destination answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Whether the destination accepted the message.
    ///
    /// Only the body is authoritative: a 2xx status with any other body is
    /// still a rejection.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.body == SUCCESS_BODY
    }
}

/// Seam between the worker and the wire.
///
/// Implementations must classify failures: anything that may succeed on a
/// later attempt is a [`DeliveryError::Temporary`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post one message body and return whatever the destination answered.
    async fn post(&self, body: &MessageBody<'_>) -> Result<TransportResponse, DeliveryError>;
}

/// Posts JSON bodies to a single, fixed webhook URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Build a transport for `url` with the given timeouts.
    ///
    /// reqwest has no write timeout of its own, so the whole request is
    /// bounded by [`DeliveryTimeouts::total`].
    ///
    /// # Errors
    ///
    /// Returns a [`SystemError::Configuration`] if the URL is not http(s) or
    /// the client cannot be built.
    pub fn new(url: Url, timeouts: &DeliveryTimeouts) -> Result<Self, DeliveryError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SystemError::Configuration(format!(
                "Destination URL must be http or https, got {url}"
            ))
            .into());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .read_timeout(timeouts.read())
            .timeout(timeouts.total())
            .build()
            .map_err(|e| SystemError::Configuration(e.to_string()))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: &MessageBody<'_>) -> Result<TransportResponse, DeliveryError> {
        outgoing!("POST {}", self.url);

        let response = self.client.post(self.url.clone()).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        outgoing!("{status} {body}");

        Ok(TransportResponse { status, body })
    }
}
