//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Read the current public address (one attempt)
//! - [`DnsProvider`]: Point one DNS host at an address (one attempt)
//! - [`StateStore`]: Durable append-only observation log
//! - [`PendingHostStore`]: Hosts still owed an update for an address
//! - [`EventSink`]: Structured event output

pub mod ip_source;
pub mod dns_provider;
pub mod state_store;
pub mod event_sink;

pub use ip_source::IpSource;
pub use dns_provider::DnsProvider;
pub use state_store::{PendingHostStore, PendingHosts, StateStore};
pub use event_sink::{CycleEvent, EventSink, RetryOperation};
