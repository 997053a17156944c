//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use std::fmt;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Address source errors (bad payload, unexpected response)
    #[error("Address source error: {0}")]
    AddressSource(String),

    /// State store errors (storage medium failures, not malformed content)
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (connect, send, body read, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// One or more hosts failed to update
    #[error(transparent)]
    Update(#[from] AggregateError),

    /// The cycle was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an address source error
    pub fn address_source(msg: impl Into<String>) -> Self {
        Self::AddressSource(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error represents caller cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A single host that could not be updated, with its underlying cause
#[derive(Debug)]
pub struct HostFailure {
    /// The host identifier
    pub host: String,
    /// Last error seen for this host once its retries were exhausted
    pub cause: Error,
}

/// Failure of a multi-host update
///
/// Carries one entry per failed host, in the order the hosts were attempted.
/// Hosts that succeeded do not appear.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<HostFailure>,
}

impl AggregateError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed host
    pub fn push(&mut self, host: impl Into<String>, cause: Error) {
        self.failures.push(HostFailure {
            host: host.into(),
            cause,
        });
    }

    /// All failures in attempt order
    pub fn failures(&self) -> &[HostFailure] {
        &self.failures
    }

    /// Identifiers of the failed hosts
    pub fn hosts(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.host.as_str()).collect()
    }

    /// Look up the cause recorded for a host
    pub fn cause_for(&self, host: &str) -> Option<&Error> {
        self.failures
            .iter()
            .find(|f| f.host == host)
            .map(|f| &f.cause)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into a `Result`, `Ok` when no host failed
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Update(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} host(s) failed to update", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{} ({})", sep, failure.host, failure.cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
