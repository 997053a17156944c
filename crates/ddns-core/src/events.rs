//! Event sink implementations
//!
//! - [`TracingEventSink`]: renders events as structured `tracing` records
//! - [`ChannelEventSink`]: forwards events over a bounded channel
//! - [`NullEventSink`]: discards everything

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::traits::event_sink::{CycleEvent, EventSink, RetryOperation};

/// Sink that writes every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CycleEvent) {
        match event {
            CycleEvent::CycleStarted { hosts } => {
                info!(hosts, "Cycle started");
            }
            CycleEvent::AddressFetched { address, attempts } => {
                info!(address = %address, attempts, "Fetched public address");
            }
            CycleEvent::RetryScheduled {
                operation,
                attempt,
                error,
                delay_ms,
            } => match operation {
                RetryOperation::Fetch => {
                    warn!(attempt, error = %error, retry_after_ms = delay_ms, "Retrying address fetch");
                }
                RetryOperation::HostUpdate { host } => {
                    warn!(host = %host, attempt, error = %error, retry_after_ms = delay_ms, "Retrying host update");
                }
            },
            CycleEvent::StateReadDegraded { error } => {
                warn!(error = %error, "Failed to read last address, treating as first run");
            }
            CycleEvent::ObservationAppended { address } => {
                debug!(address = %address, "Observation appended");
            }
            CycleEvent::AddressUnchanged { address } => {
                info!(address = %address, "Address unchanged, skipping DNS update");
            }
            CycleEvent::AddressChanged { previous, address } => {
                let previous = previous.map(|p| p.to_string()).unwrap_or_default();
                info!(last_address = %previous, new_address = %address, "Address changed or first run");
            }
            CycleEvent::HostUpdated { host, address } => {
                info!(host = %host, address = %address, "Host updated");
            }
            CycleEvent::HostUpdateFailed { host, error } => {
                error!(host = %host, error = %error, "Host update failed");
            }
            CycleEvent::PendingLedgerDegraded { error } => {
                warn!(error = %error, "Pending-host ledger unavailable");
            }
            CycleEvent::CycleCompleted { outcome } => {
                info!(outcome = %outcome, "Cycle completed");
            }
            CycleEvent::CycleFailed { error, cancelled } => {
                if cancelled {
                    warn!(error = %error, "Cycle cancelled");
                } else {
                    error!(error = %error, "Cycle failed");
                }
            }
        }
    }
}

/// Sink that forwards events to a bounded channel
///
/// When the receiver falls behind, new events are dropped with a warning
/// instead of blocking the cycle.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<CycleEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that yields its events
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CycleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: CycleEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}

/// Sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: CycleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelEventSink::new(4);
        sink.emit(CycleEvent::CycleStarted { hosts: 2 });
        sink.emit(CycleEvent::AddressUnchanged {
            address: Address::from("1.2.3.4"),
        });

        assert_eq!(rx.recv().await, Some(CycleEvent::CycleStarted { hosts: 2 }));
        assert!(matches!(
            rx.recv().await,
            Some(CycleEvent::AddressUnchanged { .. })
        ));
    }

    #[test]
    fn channel_sink_drops_when_full() {
        let (sink, mut rx) = ChannelEventSink::new(1);
        sink.emit(CycleEvent::CycleStarted { hosts: 1 });
        sink.emit(CycleEvent::CycleStarted { hosts: 2 });

        assert_eq!(rx.try_recv().ok(), Some(CycleEvent::CycleStarted { hosts: 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = CycleEvent::RetryScheduled {
            operation: RetryOperation::HostUpdate {
                host: "a.example.com".to_string(),
            },
            attempt: 1,
            error: "HTTP error: 500".to_string(),
            delay_ms: 1000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "retry_scheduled");
        assert_eq!(json["operation"]["kind"], "host_update");
        assert_eq!(json["delay_ms"], 1000);
    }
}
