//! Multi-host DNS updates
//!
//! [`DnsUpdater::update_all`] attempts every host, each under its own
//! [`RetryPolicy`] execution, and aggregates the hosts that still failed.
//! A failing host never short-circuits the remaining ones.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{AggregateError, Error, Result};
use crate::model::Address;
use crate::retry::RetryPolicy;
use crate::traits::{CycleEvent, DnsProvider, EventSink, RetryOperation};

/// Applies an address to a set of DNS hosts through a [`DnsProvider`]
pub struct DnsUpdater {
    provider: Box<dyn DnsProvider>,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl DnsUpdater {
    pub fn new(
        provider: Box<dyn DnsProvider>,
        retry: RetryPolicy,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider,
            retry,
            events,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Point every host in `hosts` at `address`
    ///
    /// An empty host list succeeds without any request.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Every host was updated
    /// - `Err(Error::Update(AggregateError))`: One entry per failed host
    /// - `Err(Error::Cancelled)`: `cancel` fired; remaining hosts were not attempted
    pub async fn update_all<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        hosts: &[S],
        address: &Address,
    ) -> Result<()> {
        let mut failures = AggregateError::new();

        for host in hosts {
            let host = host.as_ref();
            match self.update_host(cancel, host, address).await {
                Ok(()) => {
                    self.events.emit(CycleEvent::HostUpdated {
                        host: host.to_string(),
                        address: address.clone(),
                    });
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    self.events.emit(CycleEvent::HostUpdateFailed {
                        host: host.to_string(),
                        error: e.to_string(),
                    });
                    failures.push(host, e);
                }
            }
        }

        failures.into_result()
    }

    async fn update_host(
        &self,
        cancel: &CancellationToken,
        host: &str,
        address: &Address,
    ) -> Result<()> {
        self.retry
            .execute(
                cancel,
                || self.provider.update_record(host, address),
                |err, attempt, delay| {
                    self.events.emit(CycleEvent::RetryScheduled {
                        operation: RetryOperation::HostUpdate {
                            host: host.to_string(),
                        },
                        attempt,
                        error: err.to_string(),
                        delay_ms: delay.as_millis() as u64,
                    });
                },
            )
            .await
    }
}
