// # IP Source Trait
//
// Defines the interface for reading the current public address.
//
// ## Implementations
//
// - HTTP JSON endpoint: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{AddressSource, RetryPolicy};
//
// let source = AddressSource::new(Box::new(http_source), RetryPolicy::default(), events);
// let address = source.fetch(&cancel).await?;
// ```

use async_trait::async_trait;

use crate::model::Address;

/// Trait for IP source implementations
///
/// An implementation performs exactly one lookup per call. Wrapping that
/// lookup in retries is the job of [`crate::AddressSource`].
///
/// # Allowed
/// - One bounded network request per call (its own per-request timeout)
/// - Decoding the response into an [`Address`]
///
/// # Forbidden
/// - Retry or backoff loops
/// - Caching addresses between calls
/// - Touching the state store
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(Address)`: The address exactly as the remote reported it; an
    ///   empty address is rejected by the caller
    /// - `Err(Error)`: Transport, status, body-read or decode failure
    async fn current(&self) -> Result<Address, crate::Error>;

    /// Short name used in logs
    fn source_name(&self) -> &'static str {
        "ip-source"
    }
}
