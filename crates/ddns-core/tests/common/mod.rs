//! Test doubles and common utilities for cycle contract tests
//!
//! Every double records what happened into a shared [`Journal`] so tests can
//! assert on both counts and ordering across components.

#![allow(dead_code)]

use ddns_core::error::Result;
use ddns_core::model::{Address, Observation};
use ddns_core::traits::{CycleEvent, DnsProvider, EventSink, IpSource, StateStore};
use ddns_core::{
    AddressSource, DnsUpdater, Error, MemoryStateStore, Orchestrator, RetryConfig, RetryPolicy,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of side effects across doubles
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// IpSource that replays scripted results, then repeats its fallback
pub struct ScriptedIpSource {
    script: Mutex<VecDeque<Result<Address>>>,
    fallback: std::result::Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// Always answers `address`
    pub fn fixed(address: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(address.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fails with an HTTP error carrying the attempt number
    pub fn always_failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err("address endpoint unavailable".to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails `failures` times, then answers `address`
    pub fn flaky(failures: usize, address: &str) -> Self {
        let source = Self::fixed(address);
        {
            let mut script = source.script.lock().unwrap();
            for i in 0..failures {
                script.push_back(Err(Error::http(format!("transient #{}", i + 1))));
            }
        }
        source
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Address> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Ok(address) => Ok(Address::from(address.as_str())),
            Err(message) => Err(Error::http(format!("{} (attempt {})", message, n))),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// How a [`RecordingProvider`] treats a host
#[derive(Debug, Clone, Copy)]
pub enum HostBehavior {
    Succeed,
    AlwaysFail,
    /// Fail this many times, then succeed
    FailTimes(usize),
}

/// DnsProvider that journals every call and follows per-host behavior
pub struct RecordingProvider {
    journal: Journal,
    behavior: HashMap<String, HostBehavior>,
    attempts: Arc<Mutex<HashMap<String, usize>>>,
    /// Delay before answering, to leave room for cancellation
    pub latency: Duration,
}

impl RecordingProvider {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            behavior: HashMap::new(),
            attempts: Arc::new(Mutex::new(HashMap::new())),
            latency: Duration::ZERO,
        }
    }

    pub fn with_host(mut self, host: &str, behavior: HostBehavior) -> Self {
        self.behavior.insert(host.to_string(), behavior);
        self
    }

    pub fn attempts_handle(&self) -> Arc<Mutex<HashMap<String, usize>>> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn update_record(&self, host: &str, address: &Address) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(host.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.journal.push(format!("update:{}:{}", host, address));

        match self.behavior.get(host).copied().unwrap_or(HostBehavior::Succeed) {
            HostBehavior::Succeed => Ok(()),
            HostBehavior::AlwaysFail => Err(Error::provider(
                "recording",
                format!("unexpected status 500 for {}", host),
            )),
            HostBehavior::FailTimes(n) if attempt <= n => {
                Err(Error::provider("recording", format!("transient failure for {}", host)))
            }
            HostBehavior::FailTimes(_) => Ok(()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// StateStore wrapper that journals appends and can be made to fail
pub struct JournalingStateStore {
    inner: MemoryStateStore,
    journal: Journal,
    pub fail_reads: bool,
    pub fail_appends: bool,
}

impl JournalingStateStore {
    pub fn new(inner: MemoryStateStore, journal: Journal) -> Self {
        Self {
            inner,
            journal,
            fail_reads: false,
            fail_appends: false,
        }
    }
}

#[async_trait::async_trait]
impl StateStore for JournalingStateStore {
    async fn read_last(&self) -> Result<Option<Address>> {
        if self.fail_reads {
            return Err(Error::state_store("disk read error"));
        }
        self.inner.read_last().await
    }

    async fn append(&self, observation: &Observation) -> Result<()> {
        if self.fail_appends {
            return Err(Error::state_store("disk full"));
        }
        self.journal.push(format!("append:{}", observation.address()));
        self.inner.append(observation).await
    }
}

/// EventSink that keeps every event
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<CycleEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Retry settings that keep tests fast
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        initial_interval: Duration::from_millis(2),
        max_interval: Duration::from_millis(10),
        max_elapsed_time: Duration::from_secs(5),
        max_attempts,
        multiplier: 2.0,
    }
}

/// Pre-seed a memory log with one observation
pub fn log_with(address: &str) -> MemoryStateStore {
    MemoryStateStore::with_observations(vec![Observation::now(Address::from(address))])
}

pub fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

/// Assemble an orchestrator from doubles
pub fn orchestrator(
    source: ScriptedIpSource,
    store: impl StateStore + 'static,
    provider: RecordingProvider,
    hosts: Vec<String>,
    retry: RetryConfig,
    sink: RecordingSink,
) -> Orchestrator {
    let events: Arc<dyn EventSink> = Arc::new(sink);
    Orchestrator::new(
        AddressSource::new(Box::new(source), RetryPolicy::new(retry.clone()), events.clone()),
        Box::new(store),
        DnsUpdater::new(Box::new(provider), RetryPolicy::new(retry), events.clone()),
        hosts,
        events,
    )
}
