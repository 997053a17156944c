// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Keeps the observation log in a Vec. Nothing survives a restart, so the
// first cycle after a restart always counts as a change and updates DNS.
//
// ## When to Use
//
// - Testing environments
// - Embedding where an initial DNS update on every start is harmless

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{Address, Observation};
use crate::traits::state_store::{PendingHostStore, PendingHosts, StateStore};

/// In-memory observation log
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Vec<Observation>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose log already holds `observations`
    pub fn with_observations(observations: Vec<Observation>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(observations)),
        }
    }

    /// Snapshot of every observation in append order
    pub async fn observations(&self) -> Vec<Observation> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read_last(&self) -> Result<Option<Address>, Error> {
        let log = self.inner.read().await;
        Ok(log
            .iter()
            .rev()
            .map(|obs| obs.address())
            .find(|address| !address.is_empty())
            .cloned())
    }

    async fn append(&self, observation: &Observation) -> Result<(), Error> {
        self.inner.write().await.push(observation.clone());
        Ok(())
    }
}

/// In-memory pending-host ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryPendingHostStore {
    inner: Arc<RwLock<PendingHosts>>,
}

impl MemoryPendingHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> PendingHosts {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl PendingHostStore for MemoryPendingHostStore {
    async fn load(&self) -> Result<PendingHosts, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, pending: &PendingHosts) -> Result<(), Error> {
        *self.inner.write().await = pending.clone();
        Ok(())
    }
}
