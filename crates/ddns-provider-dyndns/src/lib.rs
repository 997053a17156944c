// # Dynamic DNS Provider
//
// This crate provides a query-string dynamic DNS provider for the DDNS
// system (Zonomi-style `dyndns.jsp` endpoints and compatibles).
//
// ## API Reference
//
// One request per host:
//
// ```http
// GET <base>?name=<host>&value=<address>&type=A&api_key=<credential>
// ```
//
// Any 2xx status is success. Anything else is a failure carrying the
// status and the (truncated) response body.
//
// ## Single Attempt
//
// The provider makes exactly one request per `update_record` call. Retry,
// backoff and aggregation across hosts are owned by `DnsUpdater` in the
// core.
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or error messages
// - Request errors are stripped of their URL before being reported, since
//   the URL carries the credential

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::model::Address;
use ddns_core::traits::DnsProvider;
use ddns_core::{Error, Result};
use std::time::Duration;

/// Record type sent with every update
const RECORD_TYPE: &str = "A";

/// Longest response body kept in an error
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Query-string dynamic DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, no request is sent. The intended request is
/// logged with the credential redacted and the update counts as success.
pub struct DyndnsProvider {
    /// Update endpoint without query string
    base_url: String,

    /// API credential
    /// ⚠️ NEVER log this value
    api_key: String,

    /// HTTP client with the per-request timeout applied
    client: reqwest::Client,

    /// Log instead of sending
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for DyndnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DyndnsProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DyndnsProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: Update endpoint, e.g. `https://zonomi.com/app/dns/dyndns.jsp`
    /// - `api_key`: Credential sent as `api_key`; must not be empty
    /// - `timeout`: Bound on a single request
    /// - `dry_run`: Log intended updates instead of sending them
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Provider API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            client,
            dry_run,
        })
    }

    /// Create from the core configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.api_key.clone(),
            config.request_timeout,
            config.dry_run,
        )
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn truncate_body(body: &str) -> String {
        match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        }
    }
}

#[async_trait]
impl DnsProvider for DyndnsProvider {
    async fn update_record(&self, host: &str, address: &Address) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                url = %self.base_url,
                name = host,
                value = %address,
                record_type = RECORD_TYPE,
                api_key = "<REDACTED>",
                "[DRY-RUN] Would send DNS update"
            );
            return Ok(());
        }

        tracing::debug!(name = host, value = %address, "Sending DNS update");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("name", host),
                ("value", address.as_str()),
                ("type", RECORD_TYPE),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    self.provider_name(),
                    format!("Request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::provider(
                self.provider_name(),
                format!(
                    "Unexpected status {} for {}: {}",
                    status,
                    host,
                    Self::truncate_body(&body)
                ),
            ));
        }

        tracing::info!(name = host, value = %address, "DNS record updated");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "dyndns"
    }
}
