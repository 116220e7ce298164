//! Process configuration
//!
//! The configuration is read once at startup from a RON file, then secrets
//! may be overridden from the environment (including a `.env` file).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use url::Url;
use veil_common::config::DeliveryTimeouts;
use veil_delivery::{DispatcherConfig, RetryPolicy};

use crate::controller::Veil;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "VEIL_CONFIG";
/// Environment variable overriding [`WebhookConfig::token`].
pub const TOKEN_ENV: &str = "VEIL_TOKEN";
/// Environment variable overriding [`DeliveryConfig::url`].
pub const WEBHOOK_URL_ENV: &str = "VEIL_WEBHOOK_URL";

/// Inbound webhook settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Address to bind the webhook listener
    ///
    /// Common values:
    /// - `[::]:8080` (IPv6 any address, port 8080)
    /// - `0.0.0.0:8080` (IPv4 any address, port 8080)
    /// - `127.0.0.1:8080` (localhost only, port 8080)
    #[serde(default = "defaults::listen_address")]
    pub listen_address: String,

    /// Route the slash-command posts to
    #[serde(default = "defaults::path")]
    pub path: String,

    /// Shared secret every inbound call must carry in its `token` field
    #[serde(default)]
    pub token: String,

    /// Upper bound on handling a single inbound request (in milliseconds)
    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_address: defaults::listen_address(),
            path: defaults::path(),
            token: String::new(),
            request_timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Outbound delivery settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    /// The destination webhook every message is posted to
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub timeouts: DeliveryTimeouts,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Upper bound on simultaneous outbound calls
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Upper bound on deliveries in flight; new messages are refused beyond it
    #[serde(default)]
    pub max_pending: Option<usize>,
}

impl DeliveryConfig {
    /// The destination URL, which must be http(s).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn destination(&self) -> anyhow::Result<Url> {
        if self.url.trim().is_empty() {
            anyhow::bail!(
                "No destination URL configured (set delivery.url or {WEBHOOK_URL_ENV})"
            );
        }

        let url = Url::parse(&self.url)
            .with_context(|| format!("Invalid destination URL: {}", self.url))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Destination URL must be http or https, got {url}");
        }

        Ok(url)
    }

    #[must_use]
    pub const fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent: self.max_concurrent,
            max_pending: self.max_pending,
        }
    }
}

mod defaults {
    pub fn listen_address() -> String {
        "[::]:8080".to_string()
    }

    pub fn path() -> String {
        "/webhook".to_string()
    }

    pub const fn request_timeout_ms() -> u64 {
        5000
    }
}

/// Load the configuration the way the binary does.
///
/// `.env` is loaded first (a missing file is fine), then the configuration
/// file is located with [`find_config_file`], parsed, overridden from the
/// environment and validated.
///
/// # Errors
///
/// Returns an error if no configuration file is found, it cannot be read or
/// parsed, or the resulting configuration is invalid.
pub fn load() -> anyhow::Result<Veil> {
    dotenvy::dotenv().ok();

    let config_path = find_config_file(
        std::env::var(CONFIG_ENV).ok(),
        &[
            PathBuf::from("./veil.config.ron"),
            PathBuf::from("/etc/veil/veil.config.ron"),
        ],
    )?;

    load_from(&config_path, |key| std::env::var(key).ok())
}

/// Parse the configuration at `path`, applying overrides from `env`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the
/// configuration is invalid.
pub fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Veil> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    parse(&content, env).with_context(|| format!("Invalid config in {}", path.display()))
}

/// Parse a RON configuration, applying overrides from `env`.
///
/// # Errors
///
/// Returns an error if the content is not valid RON for [`Veil`] or the
/// configuration is invalid.
pub fn parse(content: &str, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Veil> {
    let mut veil: Veil = ron::from_str(content)?;

    if let Some(token) = env(TOKEN_ENV) {
        veil.webhook.token = token;
    }

    if let Some(url) = env(WEBHOOK_URL_ENV) {
        veil.delivery.url = url;
    }

    veil.validate()?;
    Ok(veil)
}

/// Find the configuration file using the following precedence:
/// 1. `VEIL_CONFIG` environment variable (passed in as `from_env`)
/// 2. each of `default_paths`, in order
///
/// # Errors
///
/// Returns an error if `from_env` names a missing file, or none of the
/// default paths exist.
pub fn find_config_file(
    from_env: Option<String>,
    default_paths: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    if let Some(env_path) = from_env {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    if let Some(path) = default_paths.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

impl Veil {
    /// Reject configurations the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty token, a route that does not start with
    /// `/`, a destination URL that is missing or not http(s), or a zero
    /// concurrency or pending limit.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.webhook.token.trim().is_empty() {
            anyhow::bail!("No webhook token configured (set webhook.token or {TOKEN_ENV})");
        }

        if !self.webhook.path.starts_with('/') {
            anyhow::bail!(
                "Webhook path must start with '/', got {:?}",
                self.webhook.path
            );
        }

        self.delivery.destination()?;

        if self.delivery.max_pending == Some(0) {
            anyhow::bail!("delivery.max_pending must be at least 1, or None for no limit");
        }

        if self.delivery.max_concurrent == Some(0) {
            anyhow::bail!("delivery.max_concurrent must be at least 1, or None for no limit");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MINIMAL: &str = r#"(
        webhook: (token: "s3cret"),
        delivery: (url: "https://hooks.example.com/services/T000/B000"),
    )"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let veil = parse(MINIMAL, no_env).expect("config should parse");

        assert_eq!(veil.webhook.listen_address, "[::]:8080");
        assert_eq!(veil.webhook.path, "/webhook");
        assert_eq!(veil.delivery.timeouts, DeliveryTimeouts::default());
        assert_eq!(veil.delivery.retry, RetryPolicy::default());
        assert_eq!(veil.delivery.dispatcher(), DispatcherConfig::default());
        assert_eq!(veil.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_config() {
        let content = r#"(
            webhook: (listen_address: "127.0.0.1:9000", path: "/relay", token: "s3cret", request_timeout_ms: 1000),
            delivery: (
                url: "http://localhost:3000/hook",
                timeouts: (connect_ms: 100, read_ms: 200, write_ms: 300),
                retry: (max_attempts: 3, base_retry_delay_ms: 0),
                max_concurrent: Some(4),
                max_pending: Some(16),
            ),
            audit: (enabled: false, redact_message_content: true),
            shutdown_timeout_secs: 5,
        )"#;

        let veil = parse(content, no_env).expect("config should parse");

        assert_eq!(veil.webhook.path, "/relay");
        assert_eq!(veil.webhook.request_timeout(), Duration::from_secs(1));
        assert_eq!(veil.delivery.timeouts.total(), Duration::from_millis(600));
        assert_eq!(veil.delivery.retry.max_attempts, 3);
        assert_eq!(veil.delivery.retry.max_retry_delay_ms, 4000);
        assert_eq!(
            veil.delivery.dispatcher(),
            DispatcherConfig {
                max_concurrent: Some(4),
                max_pending: Some(16),
            }
        );
        assert!(!veil.audit.enabled);
        assert!(veil.audit.redact_message_content);
        assert_eq!(veil.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_environment_overrides_secrets() {
        let env = HashMap::from([
            (TOKEN_ENV, "from-env"),
            (WEBHOOK_URL_ENV, "https://hooks.example.com/other"),
        ]);

        let veil = parse(MINIMAL, |key| env.get(key).map(ToString::to_string))
            .expect("config should parse");

        assert_eq!(veil.webhook.token, "from-env");
        assert_eq!(veil.delivery.url, "https://hooks.example.com/other");
    }

    #[test]
    fn test_secrets_may_come_only_from_environment() {
        let env = HashMap::from([
            (TOKEN_ENV, "from-env"),
            (WEBHOOK_URL_ENV, "https://hooks.example.com/other"),
        ]);

        let veil = parse("(webhook: (path: \"/webhook\"))", |key| env.get(key).map(ToString::to_string))
            .expect("config should parse");

        assert_eq!(veil.webhook.token, "from-env");
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let content = r#"(webhook: (token: "  "), delivery: (url: "https://hooks.example.com"))"#;
        let err = parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("No webhook token"));
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let content = r#"(webhook: (token: "s3cret"))"#;
        let err = parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("No destination URL"));
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        let content = r#"(webhook: (token: "s3cret"), delivery: (url: "ftp://hooks.example.com"))"#;
        let err = parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("must be http or https"));
    }

    #[test]
    fn test_relative_path_is_rejected() {
        let content = r#"(
            webhook: (token: "s3cret", path: "webhook"),
            delivery: (url: "https://hooks.example.com"),
        )"#;
        assert!(parse(content, no_env).is_err());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let content = r#"(
            webhook: (token: "s3cret"),
            delivery: (url: "https://hooks.example.com", max_pending: Some(0)),
        )"#;
        let err = parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("max_pending must be at least 1"));

        let content = r#"(
            webhook: (token: "s3cret"),
            delivery: (url: "https://hooks.example.com", max_concurrent: Some(0)),
        )"#;
        let err = parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("max_concurrent must be at least 1"));
    }

    #[test]
    fn test_find_config_file_prefers_environment() {
        let dir = tempfile::tempdir().unwrap();
        let from_env = dir.path().join("custom.ron");
        let default = dir.path().join("veil.config.ron");
        std::fs::write(&from_env, MINIMAL).unwrap();
        std::fs::write(&default, MINIMAL).unwrap();

        let found = find_config_file(
            Some(from_env.display().to_string()),
            std::slice::from_ref(&default),
        )
        .unwrap();

        assert_eq!(found, from_env);
    }

    #[test]
    fn test_find_config_file_missing_environment_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");

        let err = find_config_file(Some(missing.display().to_string()), &[]).unwrap_err();
        assert!(err.to_string().contains("non-existent file"));
    }

    #[test]
    fn test_find_config_file_falls_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.ron");
        let second = dir.path().join("second.ron");
        std::fs::write(&second, MINIMAL).unwrap();

        let found = find_config_file(None, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(found, second);

        std::fs::write(&first, MINIMAL).unwrap();
        let found = find_config_file(None, &[first.clone(), second]).unwrap();
        assert_eq!(found, first);
    }

    #[test]
    fn test_find_config_file_lists_paths_tried() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");

        let err = find_config_file(None, std::slice::from_ref(&missing)).unwrap_err();
        assert!(err.to_string().contains(&missing.display().to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.config.ron");
        std::fs::write(&path, MINIMAL).unwrap();

        let veil = load_from(&path, no_env).expect("config should load");
        assert_eq!(veil.webhook.token, "s3cret");
    }
}
