// # ddns-core
//
// Core library for the DDNS change-detection and update pipeline.
//
// ## Architecture Overview
//
// - **RetryPolicy**: Bounded exponential backoff with cancellation
// - **AddressSource**: Retried lookup of the current public address
// - **StateStore**: Durable append-only log of observed addresses
// - **DnsUpdater**: Per-host retried DNS updates with aggregated failures
// - **Orchestrator**: One fetch → compare → persist → update cycle
//
// Plugins implement the single-shot seams (`IpSource`, `DnsProvider`);
// retry, aggregation and the update decision live here.
//
// ## Design Principles
//
// 1. **Durability first**: An observation is on disk before any DNS request
// 2. **Independent hosts**: One host's failures never starve another
// 3. **Structured events**: Components emit `CycleEvent`s to an injected sink
// 4. **Library-First**: The daemon is a thin wrapper around `Orchestrator`

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod retry;
pub mod source;
pub mod state;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{
    AddressSourceConfig, DdnsConfig, HealthConfig, ProviderConfig, RetryConfig, ScheduleConfig,
};
pub use engine::{CycleOutcome, Orchestrator};
pub use error::{AggregateError, Error, HostFailure, Result};
pub use events::{ChannelEventSink, NullEventSink, TracingEventSink};
pub use model::{Address, Observation};
pub use retry::RetryPolicy;
pub use source::AddressSource;
pub use state::{FilePendingHostStore, FileStateStore, MemoryPendingHostStore, MemoryStateStore};
pub use traits::{CycleEvent, DnsProvider, EventSink, IpSource, PendingHostStore, StateStore};
pub use updater::DnsUpdater;

/// Cancellation handle accepted by every cycle entry point
pub use tokio_util::sync::CancellationToken;
