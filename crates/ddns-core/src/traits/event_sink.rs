// # Event Sink Trait
//
// Components report what they do as structured `CycleEvent`s through an
// injected sink instead of formatting log lines themselves. The sink
// decides how to render or forward them (see `crate::events`).

use serde::Serialize;

use crate::model::Address;

/// Which retried operation a retry event belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryOperation {
    /// Fetching the current address
    Fetch,
    /// Updating one DNS host
    HostUpdate { host: String },
}

/// Events emitted during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CycleEvent {
    /// A cycle began
    CycleStarted { hosts: usize },

    /// The address source answered
    AddressFetched { address: Address, attempts: u32 },

    /// An attempt failed and another one is scheduled
    RetryScheduled {
        operation: RetryOperation,
        attempt: u32,
        error: String,
        delay_ms: u64,
    },

    /// The log could not be read; continuing as if there were no prior address
    StateReadDegraded { error: String },

    /// A new observation is durable
    ObservationAppended { address: Address },

    /// Fetched address matches the last observation
    AddressUnchanged { address: Address },

    /// Fetched address differs from the last observation (or there was none)
    AddressChanged {
        previous: Option<Address>,
        address: Address,
    },

    /// A host now points at the address
    HostUpdated { host: String, address: Address },

    /// A host could not be updated after its retries were exhausted
    HostUpdateFailed { host: String, error: String },

    /// The pending-host ledger could not be read or written
    PendingLedgerDegraded { error: String },

    /// The cycle finished successfully
    CycleCompleted { outcome: String },

    /// The cycle ended with an error
    CycleFailed { error: String, cancelled: bool },
}

/// Destination for [`CycleEvent`]s
///
/// `emit` must not block; implementations drop events rather than stall a
/// cycle.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CycleEvent);
}
