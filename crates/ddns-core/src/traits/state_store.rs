// # State Store Trait
//
// Defines the interface for the durable observation log.
//
// ## Purpose
//
// The log records every address the daemon has fetched. Its last valid
// entry is the "last known address" used for change detection.
//
// ## Implementations
//
// - File-based: newline-delimited JSON (`state::FileStateStore`)
// - In-memory: `state::MemoryStateStore`

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::model::{Address, Observation};

/// Trait for state store implementations
///
/// # Invariants
///
/// - The log is append-only: existing records are never rewritten,
///   truncated or compacted.
/// - The last record that decodes is authoritative.
/// - A missing log means "no prior observation", not an error.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Address of the most recent valid observation
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Address))`: The last record that decodes
    /// - `Ok(None)`: No log yet, or no record in it decodes
    /// - `Err(Error)`: The storage medium itself failed
    async fn read_last(&self) -> Result<Option<Address>, crate::Error>;

    /// Durably append one observation
    ///
    /// Must not return `Ok` until the record is on durable storage.
    async fn append(&self, observation: &Observation) -> Result<(), crate::Error>;
}

/// Hosts still owed an update, keyed by host, valued by the address they
/// should carry
pub type PendingHosts = BTreeMap<String, Address>;

/// Ledger of hosts whose last update attempt failed
///
/// Lets a later cycle retry those hosts even when the fetched address has
/// not changed since.
#[async_trait]
pub trait PendingHostStore: Send + Sync {
    /// Load the ledger, empty when nothing has been recorded
    async fn load(&self) -> Result<PendingHosts, crate::Error>;

    /// Replace the ledger contents
    async fn save(&self, pending: &PendingHosts) -> Result<(), crate::Error>;
}
