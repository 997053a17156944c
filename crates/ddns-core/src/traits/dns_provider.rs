// # DNS Provider Trait
//
// Defines the interface for pointing a DNS host at an address.
//
// ## Implementations
//
// - Generic query-string dyndns endpoint: `ddns-provider-dyndns` crate

use async_trait::async_trait;

use crate::model::Address;

/// Trait for DNS provider implementations
///
/// Providers are single-shot: one request per call, success or error.
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (owned by [`crate::DnsUpdater`])
/// - ❌ Access the state store
/// - ❌ Decide whether an update is needed (owned by [`crate::Orchestrator`])
/// - ❌ Log the API credential
///
/// **Correct approach**: Return an error. The updater retries according to
/// its configured policy, separately for every host.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Point `host` at `address`
    ///
    /// # Parameters
    ///
    /// - `host`: The DNS record name (e.g., "home.example.com")
    /// - `address`: The address to publish
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider acknowledged the update with a 2xx status
    /// - `Err(Error)`: The request could not be sent or was rejected
    async fn update_record(&self, host: &str, address: &Address) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
