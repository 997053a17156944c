// # HTTP IP Source
//
// This crate provides the HTTP address source for the DDNS system.
//
// ## Wire Format
//
// `GET <url>` must answer 2xx with a JSON body carrying an `ip` field:
//
// ```text
// {"ip": "203.0.113.7"}
// ```
//
// The field is returned verbatim. No parsing or normalization is applied,
// so whatever the endpoint reports is what gets compared and published.
//
// ## Retry
//
// One call to `current()` is one attempt. Connection failures, non-2xx
// status, body-read failures and decode failures are all returned as
// errors for the core's retry policy to handle. The per-request timeout
// on the client bounds a single attempt only.

use ddns_core::config::AddressSourceConfig;
use ddns_core::model::Address;
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};

use serde::Deserialize;
use std::time::Duration;

/// Expected response body
#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Address source backed by a JSON HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client with the per-request timeout applied
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint answering `{"ip": "..."}`
    /// - `timeout`: Bound on a single request, connect through body
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create from the core configuration
    pub fn from_config(config: &AddressSourceConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.request_timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn decode(body: &[u8]) -> Result<Address> {
        let response: IpResponse = serde_json::from_slice(body)
            .map_err(|e| Error::address_source(format!("Malformed address response: {}", e)))?;
        if response.ip.trim().is_empty() {
            return Err(Error::address_source("Address endpoint returned an empty address"));
        }
        Ok(Address::new(response.ip))
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Address> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!(
                "Address endpoint returned {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        let address = Self::decode(&body)?;
        tracing::debug!(url = %self.url, %address, "Fetched address");
        Ok(address)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
