//! Retried address discovery
//!
//! [`AddressSource`] wraps a single-shot [`IpSource`] in a [`RetryPolicy`].
//! Every failed attempt is reported as [`CycleEvent::RetryScheduled`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::Address;
use crate::retry::RetryPolicy;
use crate::traits::{CycleEvent, EventSink, IpSource, RetryOperation};

/// Fetches the current public address with bounded retry
pub struct AddressSource {
    source: Box<dyn IpSource>,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl AddressSource {
    pub fn new(source: Box<dyn IpSource>, retry: RetryPolicy, events: Arc<dyn EventSink>) -> Self {
        Self {
            source,
            retry,
            events,
        }
    }

    /// Fetch the address, retrying transient failures
    ///
    /// # Returns
    ///
    /// - `Ok(Address)`: The address exactly as reported, never empty
    /// - `Err(Error::Cancelled)`: `cancel` fired
    /// - `Err(Error)`: The last attempt's error once the budget is spent
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<Address> {
        let mut attempts = 0u32;

        let address = self
            .retry
            .execute(
                cancel,
                || {
                    attempts += 1;
                    let current = self.source.current();
                    async move {
                        let address = current.await?;
                        if address.is_empty() {
                            return Err(Error::address_source("Source reported an empty address"));
                        }
                        Ok(address)
                    }
                },
                |err, attempt, delay| {
                    self.events.emit(CycleEvent::RetryScheduled {
                        operation: RetryOperation::Fetch,
                        attempt,
                        error: err.to_string(),
                        delay_ms: delay.as_millis() as u64,
                    });
                },
            )
            .await?;

        tracing::debug!(
            source = self.source.source_name(),
            attempts,
            "Address source answered"
        );
        self.events.emit(CycleEvent::AddressFetched {
            address: address.clone(),
            attempts,
        });

        Ok(address)
    }
}
