//! Inbound webhook server
//!
//! Accepts form-encoded slash-command posts, checks the shared token, and
//! either hands the message to the dispatcher or answers with the reasons it
//! was rejected.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use sha2::{Digest, Sha256, digest::Output};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::timeout::TimeoutLayer;
use veil_common::{
    RejectionResponse, Signal, audit, incoming, internal,
    tracing::{info, warn},
    validate,
};
use veil_delivery::Dispatcher;

use crate::config::WebhookConfig;

/// Form field carrying the shared secret.
pub const TOKEN_PARAM: &str = "token";

/// Shared state for the webhook handler.
#[derive(Clone)]
pub struct WebhookState {
    token_digest: Output<Sha256>,
    dispatcher: Dispatcher,
}

impl WebhookState {
    #[must_use]
    pub fn new(token: &str, dispatcher: Dispatcher) -> Self {
        Self {
            token_digest: Sha256::digest(token.as_bytes()),
            dispatcher,
        }
    }

    /// Check a caller-supplied token against the configured secret.
    ///
    /// Both sides are hashed first so the comparison does not depend on the
    /// secret's length or content.
    #[must_use]
    pub fn is_authorized(&self, token: Option<&str>) -> bool {
        token.is_some_and(|token| Sha256::digest(token.as_bytes()) == self.token_digest)
    }
}

/// Build the webhook router: a single `POST {path}` route.
pub fn router(config: &WebhookConfig, state: WebhookState) -> Router {
    Router::new()
        .route(&config.path, post(relay_handler))
        .with_state(Arc::new(state))
        .layer(TimeoutLayer::new(config.request_timeout()))
}

/// Webhook HTTP server
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
}

impl WebhookServer {
    /// Bind the webhook listener.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn bind(config: &WebhookConfig, dispatcher: Dispatcher) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .with_context(|| format!("Failed to bind webhook to {}", config.listen_address))?;

        info!(
            address = %config.listen_address,
            path = %config.path,
            "Webhook server bound successfully"
        );

        let router = router(config, WebhookState::new(&config.token, dispatcher));

        Ok(Self { listener, router })
    }

    /// The address actually bound, useful when binding to port 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until a shutdown signal is received.
    ///
    /// In-progress requests are allowed to finish; new connections are
    /// refused once the signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<Signal>) -> anyhow::Result<()> {
        internal!(level = INFO, "Webhook server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                internal!(level = INFO, "Webhook server received shutdown signal");
            })
            .await
            .context("Webhook server failed")?;

        internal!(level = INFO, "Webhook server stopped");
        Ok(())
    }
}

/// Relay handler
///
/// - Missing or wrong token: `401`, empty body
/// - Valid message: dispatched, `200`, empty body
/// - Invalid message: `200` with the ephemeral rejection body
async fn relay_handler(
    State(state): State<Arc<WebhookState>>,
    Form(mut params): Form<HashMap<String, String>>,
) -> Response {
    incoming!("Webhook call with {} fields", params.len());

    let token = params.remove(TOKEN_PARAM);
    if !state.is_authorized(token.as_deref()) {
        warn!("Webhook call with a missing or invalid token");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match validate(&params) {
        Ok(message) => {
            if let Err(error) = state.dispatcher.submit(message) {
                warn!(error = %error, "Accepted message could not be dispatched");
            }
            StatusCode::OK.into_response()
        }
        Err(rejections) => {
            let rules = rejections
                .iter()
                .map(|(rule, _)| rule.key())
                .collect::<Vec<_>>();
            audit::log_message_rejected(&rules);

            (StatusCode::OK, Json(RejectionResponse::from(&rejections))).into_response()
        }
    }
}
