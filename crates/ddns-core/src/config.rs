//! Configuration types for the DDNS system
//!
//! These structures are loaded once at process start and handed to the
//! core by value. The core never re-reads them from the environment.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::Error;

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Where the current public address is discovered
    #[serde(default)]
    pub address_source: AddressSourceConfig,

    /// DNS provider endpoint and credential
    pub provider: ProviderConfig,

    /// DNS hosts to keep pointed at the current address
    pub hosts: Vec<String>,

    /// Path of the append-only observation log
    pub log_path: PathBuf,

    /// Retry behaviour shared by the fetch and every per-host update
    #[serde(default)]
    pub retry: RetryConfig,

    /// When cycles run
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Liveness endpoint
    #[serde(default)]
    pub health: HealthConfig,
}

impl DdnsConfig {
    /// Create a configuration with defaults for everything but the
    /// credential, hosts and log path
    pub fn new(
        api_key: impl Into<String>,
        hosts: Vec<String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            address_source: AddressSourceConfig::default(),
            provider: ProviderConfig::new(api_key),
            hosts,
            log_path: log_path.into(),
            retry: RetryConfig::default(),
            schedule: ScheduleConfig::default(),
            health: HealthConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.hosts.is_empty() {
            return Err(Error::config("No hosts configured"));
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(Error::config("Host names cannot be empty"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(Error::config("Log path cannot be empty"));
        }

        self.address_source.validate()?;
        self.provider.validate()?;
        self.retry.validate()?;
        self.schedule.validate()?;

        if self.address_source.request_timeout >= self.retry.max_elapsed_time {
            return Err(Error::config(format!(
                "Address request timeout ({:?}) must be smaller than the retry budget ({:?})",
                self.address_source.request_timeout, self.retry.max_elapsed_time
            )));
        }

        Ok(())
    }
}

/// Address source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSourceConfig {
    /// URL returning `{"ip": "<address>"}`
    #[serde(default = "default_address_url")]
    pub url: String,

    /// Bound on a single request attempt
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

impl AddressSourceConfig {
    pub fn validate(&self) -> Result<(), Error> {
        validate_url("Address source URL", &self.url)?;
        if self.request_timeout.is_zero() {
            return Err(Error::config("Address request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for AddressSourceConfig {
    fn default() -> Self {
        Self {
            url: default_address_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the query-string update endpoint
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// API credential, sent as `api_key`
    pub api_key: String,

    /// Log intended updates instead of sending them
    #[serde(default)]
    pub dry_run: bool,

    /// Bound on a single update request
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: default_provider_url(),
            api_key: api_key.into(),
            dry_run: false,
            request_timeout: default_request_timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_url("Provider URL", &self.url)?;
        if self.api_key.is_empty() {
            return Err(Error::config("Provider API key cannot be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("Provider request timeout must be > 0"));
        }
        Ok(())
    }
}

// Keeps the API key out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("api_key", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Exponential backoff parameters
///
/// `max_attempts` counts every attempt including the first one, so
/// `max_attempts = 1` disables retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Wait before the second attempt
    #[serde(default = "default_initial_interval", with = "duration_millis")]
    pub initial_interval: Duration,

    /// Ceiling on any single wait
    #[serde(default = "default_max_interval", with = "duration_millis")]
    pub max_interval: Duration,

    /// Give up once this much wall-clock time would be exceeded
    #[serde(default = "default_max_elapsed_time", with = "duration_millis")]
    pub max_elapsed_time: Duration,

    /// Total attempts allowed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Growth factor applied to the wait after each failure
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::config("Retry max_attempts must be >= 1"));
        }
        if self.initial_interval > self.max_interval {
            return Err(Error::config(
                "Retry initial_interval cannot exceed max_interval",
            ));
        }
        if self.max_elapsed_time.is_zero() {
            return Err(Error::config("Retry max_elapsed_time must be > 0"));
        }
        if !(self.multiplier >= 1.0 && self.multiplier.is_finite()) {
            return Err(Error::config("Retry multiplier must be a finite value >= 1.0"));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            max_elapsed_time: default_max_elapsed_time(),
            max_attempts: default_max_attempts(),
            multiplier: default_multiplier(),
        }
    }
}

/// Daily trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local time of day as `HH:MM`
    #[serde(default = "default_schedule_time")]
    pub time: String,

    /// IANA timezone name the time is interpreted in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Run a single cycle and exit
    #[serde(default)]
    pub run_once: bool,
}

impl ScheduleConfig {
    /// Parse `time` into (hour, minute)
    pub fn hour_minute(&self) -> Result<(u32, u32), Error> {
        let (h, m) = self.time.split_once(':').ok_or_else(|| {
            Error::config(format!(
                "Invalid schedule time '{}', expected HH:MM",
                self.time
            ))
        })?;

        let hour: u32 = h
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Invalid schedule hour '{}'", h)))?;
        let minute: u32 = m
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Invalid schedule minute '{}'", m)))?;

        if hour > 23 || minute > 59 {
            return Err(Error::config(format!(
                "Invalid schedule time {}: hour must be 0-23, minute must be 0-59",
                self.time
            )));
        }

        Ok((hour, minute))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.timezone.is_empty() {
            return Err(Error::config("Schedule timezone cannot be empty"));
        }
        self.hour_minute().map(|_| ())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_schedule_time(),
            timezone: default_timezone(),
            run_once: false,
        }
    }
}

/// Liveness endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,

    #[serde(default = "default_health_addr")]
    pub bind: SocketAddr,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            bind: default_health_addr(),
        }
    }
}

fn validate_url(what: &str, url: &str) -> Result<(), Error> {
    if url.is_empty() {
        return Err(Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn default_address_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

fn default_provider_url() -> String {
    "https://zonomi.com/app/dns/dyndns.jsp".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_initial_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_elapsed_time() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    4
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_schedule_time() -> String {
    "23:59".to_string()
}

fn default_timezone() -> String {
    "Europe/London".to_string()
}

fn default_health_enabled() -> bool {
    true
}

fn default_health_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
