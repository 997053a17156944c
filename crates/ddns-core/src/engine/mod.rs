//! Core DDNS cycle orchestration
//!
//! The [`Orchestrator`] runs one fetch → compare → persist → update cycle
//! per call to [`Orchestrator::run_cycle`]:
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ AddressSource │──▶│ StateStore   │──▶│ StateStore   │──▶│ DnsUpdater  │
//! │ fetch (retry) │   │ read_last    │   │ append       │   │ update_all  │
//! └───────────────┘   └──────────────┘   └──────────────┘   └─────────────┘
//!      Fetching          Comparing          Persisting        Updating
//! ```
//!
//! ## Cycle Rules
//!
//! 1. A failed fetch ends the cycle; nothing is persisted
//! 2. A failed log read degrades to "no prior address" with a warning
//! 3. The observation is appended on every successful fetch, changed or
//!    not, and must be durable before any DNS request is made
//! 4. DNS is updated when there is no prior address or it differs
//! 5. Hosts whose update failed are kept in the optional pending ledger and
//!    retried on later cycles even if the address has not changed again
//!
//! The orchestrator keeps no state between cycles beyond what the stores
//! persist. Callers must not run cycles concurrently on the same log.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{Address, Observation};
use crate::source::AddressSource;
use crate::traits::{CycleEvent, EventSink, PendingHostStore, PendingHosts, StateStore};
use crate::updater::DnsUpdater;

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Address matched the last observation and no host was pending
    Unchanged { address: Address },

    /// Address changed (or first run) and every host was updated
    Updated {
        previous: Option<Address>,
        address: Address,
    },

    /// Address unchanged, but hosts left over from an earlier failure were
    /// brought up to date
    Reconciled { address: Address, hosts: Vec<String> },
}

impl CycleOutcome {
    pub fn address(&self) -> &Address {
        match self {
            Self::Unchanged { address }
            | Self::Updated { address, .. }
            | Self::Reconciled { address, .. } => address,
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged { .. } => f.write_str("unchanged"),
            Self::Updated { .. } => f.write_str("updated"),
            Self::Reconciled { .. } => f.write_str("reconciled"),
        }
    }
}

/// Single entry point for one DDNS cycle
pub struct Orchestrator {
    source: AddressSource,
    store: Box<dyn StateStore>,
    updater: DnsUpdater,
    pending: Option<Box<dyn PendingHostStore>>,
    hosts: Vec<String>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Create an orchestrator
    ///
    /// # Parameters
    ///
    /// - `source`: Retried address source
    /// - `store`: Observation log
    /// - `updater`: Multi-host DNS updater
    /// - `hosts`: Hosts to update, in order; not de-duplicated here
    /// - `events`: Sink for cycle-level events
    pub fn new(
        source: AddressSource,
        store: Box<dyn StateStore>,
        updater: DnsUpdater,
        hosts: Vec<String>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source,
            store,
            updater,
            pending: None,
            hosts,
            events,
        }
    }

    /// Track hosts whose update failed so later cycles retry them
    pub fn with_pending_store(mut self, pending: Box<dyn PendingHostStore>) -> Self {
        self.pending = Some(pending);
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Run one cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome)`: What the cycle did
    /// - `Err(Error::Cancelled)`: `cancel` fired mid-cycle
    /// - `Err(Error::Update(_))`: Observation persisted, some hosts failed
    /// - `Err(Error)`: Fetch or append failure
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        self.events.emit(CycleEvent::CycleStarted {
            hosts: self.hosts.len(),
        });

        let result = self.run_stages(cancel).await;

        match &result {
            Ok(outcome) => self.events.emit(CycleEvent::CycleCompleted {
                outcome: outcome.to_string(),
            }),
            Err(e) => self.events.emit(CycleEvent::CycleFailed {
                error: e.to_string(),
                cancelled: e.is_cancelled(),
            }),
        }

        result
    }

    async fn run_stages(&self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        // Fetching
        let address = self.source.fetch(cancel).await?;

        // Comparing
        let previous = match self.store.read_last().await {
            Ok(previous) => previous,
            Err(e) => {
                self.events.emit(CycleEvent::StateReadDegraded {
                    error: e.to_string(),
                });
                None
            }
        };

        // Persisting
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.store.append(&Observation::now(address.clone())).await?;
        self.events.emit(CycleEvent::ObservationAppended {
            address: address.clone(),
        });

        // Decision
        let changed = previous
            .as_ref()
            .is_none_or(|prev| prev.is_empty() || *prev != address);
        let ledger = self.load_pending().await;

        let targets: Vec<String> = if changed {
            self.events.emit(CycleEvent::AddressChanged {
                previous: previous.clone(),
                address: address.clone(),
            });
            self.hosts.clone()
        } else {
            self.events.emit(CycleEvent::AddressUnchanged {
                address: address.clone(),
            });
            self.hosts
                .iter()
                .filter(|host| ledger.get(host.as_str()) == Some(&address))
                .cloned()
                .collect()
        };

        if !changed && targets.is_empty() {
            self.save_pending(&ledger, PendingHosts::new()).await;
            return Ok(CycleOutcome::Unchanged { address });
        }

        // Updating
        let result = self.updater.update_all(cancel, &targets, &address).await;
        self.save_pending(&ledger, Self::next_pending(&targets, &address, &result))
            .await;
        result?;

        Ok(if changed {
            CycleOutcome::Updated { previous, address }
        } else {
            CycleOutcome::Reconciled {
                address,
                hosts: targets,
            }
        })
    }

    /// Hosts still owed `address` after an update attempt over `targets`
    fn next_pending(targets: &[String], address: &Address, result: &Result<()>) -> PendingHosts {
        let owed: Vec<&str> = match result {
            Ok(()) => Vec::new(),
            Err(Error::Update(failures)) => failures.hosts(),
            // Unknown which hosts landed before the failure
            Err(_) => targets.iter().map(String::as_str).collect(),
        };

        owed.into_iter()
            .map(|host| (host.to_string(), address.clone()))
            .collect()
    }

    async fn load_pending(&self) -> PendingHosts {
        let Some(store) = &self.pending else {
            return PendingHosts::new();
        };

        match store.load().await {
            Ok(pending) => pending,
            Err(e) => {
                self.events.emit(CycleEvent::PendingLedgerDegraded {
                    error: e.to_string(),
                });
                PendingHosts::new()
            }
        }
    }

    async fn save_pending(&self, previous: &PendingHosts, next: PendingHosts) {
        let Some(store) = &self.pending else {
            return;
        };
        if *previous == next {
            return;
        }

        if let Err(e) = store.save(&next).await {
            self.events.emit(CycleEvent::PendingLedgerDegraded {
                error: e.to_string(),
            });
        }
    }
}
