// # Daemon configuration
//
// All configuration is read from environment variables, once, at startup.
// Parsing goes through an injectable lookup so tests never touch the
// process environment.
//
// ### Address Source
// - `DDNS_ADDRESS_URL`: Endpoint answering `{"ip": "..."}`
// - `DDNS_REQUEST_TIMEOUT_SECS`: Bound on one HTTP request (address and DNS)
//
// ### DNS Provider
// - `DDNS_PROVIDER_URL`: Query-string update endpoint
// - `DDNS_PROVIDER_API_KEY`: API key (required)
// - `DDNS_PROVIDER_API_KEY_ENCRYPTED`: `true` if the key is AES-256-GCM sealed
// - `DDNS_ENCRYPTION_KEY`: 32-byte key opening the sealed API key
// - `DDNS_MODE`: `live` (default) or `dry-run`
//
// ### Hosts and Log
// - `DDNS_HOSTS`: Comma-separated DNS hosts to update (required)
// - `DDNS_LOG_PATH`: Observation log path
//
// ### Retry
// - `DDNS_MAX_RETRIES`: Retries after the first attempt
// - `DDNS_RETRY_INITIAL_MS`, `DDNS_RETRY_MAX_MS`, `DDNS_RETRY_MAX_ELAPSED_SECS`
//
// ### Schedule
// - `DDNS_SCHEDULE_TIME`: Daily `HH:MM`
// - `DDNS_TIMEZONE`: IANA timezone name
// - `DDNS_RUN_ONCE`: Run one cycle and exit
//
// ### Health and Logging
// - `DDNS_HEALTH_ENABLED`, `DDNS_HEALTH_ADDR`
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error
// - `DDNS_LOG_FORMAT`: text or json

use anyhow::{Context, Result};
use ddns_core::config::DdnsConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::schedule;
use crate::secret;

/// Default observation log location
const DEFAULT_LOG_PATH: &str = "/app/data/ip_log.log";

/// Upper bound on `DDNS_MAX_RETRIES`
const MAX_RETRIES_LIMIT: u32 = 10;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "DDNS_LOG_FORMAT '{}' is not valid. Valid formats: text, json",
                s
            ),
        }
    }
}

/// Everything the daemon needs, resolved from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Core pipeline configuration
    pub ddns: DdnsConfig,

    /// Tracing level filter
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = Self::load_api_key(&var)?;
        let hosts = parse_hosts(&var("DDNS_HOSTS").unwrap_or_default());
        let log_path = var("DDNS_LOG_PATH").unwrap_or_else(|| DEFAULT_LOG_PATH.to_string());

        let mut ddns = DdnsConfig::new(api_key, hosts, PathBuf::from(log_path));

        if let Some(url) = var("DDNS_ADDRESS_URL") {
            ddns.address_source.url = url;
        }
        if let Some(url) = var("DDNS_PROVIDER_URL") {
            ddns.provider.url = url;
        }
        if let Some(secs) = parse_var::<u64>(&var, "DDNS_REQUEST_TIMEOUT_SECS")? {
            let timeout = Duration::from_secs(secs);
            ddns.address_source.request_timeout = timeout;
            ddns.provider.request_timeout = timeout;
        }

        ddns.provider.dry_run = match var("DDNS_MODE").as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DDNS_MODE '{}' is not supported. Supported modes: live, dry-run",
                other
            ),
        };

        if let Some(retries) = parse_var::<u32>(&var, "DDNS_MAX_RETRIES")? {
            if retries > MAX_RETRIES_LIMIT {
                anyhow::bail!(
                    "DDNS_MAX_RETRIES must be between 0 and {}. Got: {}",
                    MAX_RETRIES_LIMIT,
                    retries
                );
            }
            ddns.retry.max_attempts = retries + 1;
        }
        if let Some(ms) = parse_var::<u64>(&var, "DDNS_RETRY_INITIAL_MS")? {
            ddns.retry.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&var, "DDNS_RETRY_MAX_MS")? {
            ddns.retry.max_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&var, "DDNS_RETRY_MAX_ELAPSED_SECS")? {
            ddns.retry.max_elapsed_time = Duration::from_secs(secs);
        }

        if let Some(time) = var("DDNS_SCHEDULE_TIME") {
            ddns.schedule.time = time;
        }
        if let Some(tz) = var("DDNS_TIMEZONE") {
            ddns.schedule.timezone = tz;
        }
        if let Some(run_once) = parse_bool(&var, "DDNS_RUN_ONCE")? {
            ddns.schedule.run_once = run_once;
        }

        if let Some(enabled) = parse_bool(&var, "DDNS_HEALTH_ENABLED")? {
            ddns.health.enabled = enabled;
        }
        if let Some(addr) = parse_var(&var, "DDNS_HEALTH_ADDR")? {
            ddns.health.bind = addr;
        }

        let log_format = match var("DDNS_LOG_FORMAT") {
            Some(format) => format.parse()?,
            None => LogFormat::Text,
        };

        Ok(Self {
            ddns,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
        })
    }

    /// Resolve the provider API key, opening it if it is sealed
    fn load_api_key(var: &impl Fn(&str) -> Option<String>) -> Result<String> {
        let api_key = var("DDNS_PROVIDER_API_KEY").ok_or_else(|| {
            anyhow::anyhow!(
                "DDNS_PROVIDER_API_KEY is required. \
                Set it via: export DDNS_PROVIDER_API_KEY=your_key"
            )
        })?;

        if !parse_bool(var, "DDNS_PROVIDER_API_KEY_ENCRYPTED")?.unwrap_or(false) {
            return Ok(api_key);
        }

        let key = var("DDNS_ENCRYPTION_KEY").ok_or_else(|| {
            anyhow::anyhow!(
                "DDNS_ENCRYPTION_KEY is required when DDNS_PROVIDER_API_KEY_ENCRYPTED=true"
            )
        })?;

        secret::decrypt_api_key(&api_key, &key).context("Failed to open DDNS_PROVIDER_API_KEY")
    }

    /// Validate the configuration
    ///
    /// Runs the core checks plus what only the daemon knows about: host
    /// name syntax, the timezone database and the log level.
    pub fn validate(&self) -> Result<()> {
        if self.ddns.hosts.is_empty() {
            anyhow::bail!(
                "DDNS_HOSTS must contain at least one host. \
                Set it via: export DDNS_HOSTS=home.example.com,vpn.example.com"
            );
        }
        for host in &self.ddns.hosts {
            validate_domain_name(host)?;
        }

        self.ddns.validate().context("Invalid configuration")?;
        schedule::parse_timezone(&self.ddns.schedule.timezone)?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Split, trim and de-duplicate a comma-separated host list, keeping order
pub fn parse_hosts(raw: &str) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for host in raw.split(',').map(str::trim).filter(|h| !h.is_empty()) {
        if !hosts.iter().any(|seen| seen == host) {
            hosts.push(host.to_string());
        }
    }
    hosts
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
        })
        .transpose()
}

fn parse_bool(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    var(key)
        .map(|raw| match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(anyhow::anyhow!(
                "{} must be true or false. Got: {}",
                key,
                raw
            )),
        })
        .transpose()
}

/// Basic RFC 1035 host name check
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Host name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Host name has empty label: '{}'", domain);
        }
        if label.len() > 63 {
            anyhow::bail!(
                "Host label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Host label contains invalid characters. Label: '{}'",
                label
            );
        }
        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Host label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::tests::{TEST_KEY, seal};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DDNS_PROVIDER_API_KEY", "plain-key"),
        ("DDNS_HOSTS", "home.example.com"),
    ];

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = load(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.ddns.provider.api_key, "plain-key");
        assert_eq!(config.ddns.hosts, vec!["home.example.com"]);
        assert_eq!(config.ddns.log_path, PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(config.ddns.retry.max_attempts, 4);
        assert_eq!(config.ddns.schedule.time, "23:59");
        assert_eq!(config.ddns.schedule.timezone, "Europe/London");
        assert!(!config.ddns.schedule.run_once);
        assert!(!config.ddns.provider.dry_run);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = load(&[("DDNS_HOSTS", "home.example.com")]).unwrap_err();
        assert!(err.to_string().contains("DDNS_PROVIDER_API_KEY"));
    }

    #[test]
    fn missing_hosts_fail_validation() {
        let config = load(&[("DDNS_PROVIDER_API_KEY", "k")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn hosts_are_trimmed_and_deduplicated_in_order() {
        assert_eq!(
            parse_hosts(" b.example.com, a.example.com,,b.example.com , "),
            vec!["b.example.com", "a.example.com"]
        );
    }

    #[test]
    fn max_retries_counts_retries_after_first_attempt() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DDNS_MAX_RETRIES", "0"));
        assert_eq!(load(&vars).unwrap().ddns.retry.max_attempts, 1);

        vars.pop();
        vars.push(("DDNS_MAX_RETRIES", "11"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn unparseable_number_is_an_error() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DDNS_RETRY_INITIAL_MS", "soon"));
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("DDNS_RETRY_INITIAL_MS"));
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = MINIMAL.to_vec();
        vars.extend([
            ("DDNS_ADDRESS_URL", "http://127.0.0.1:8080/ip"),
            ("DDNS_PROVIDER_URL", "http://127.0.0.1:8080/dyndns"),
            ("DDNS_REQUEST_TIMEOUT_SECS", "3"),
            ("DDNS_RETRY_MAX_ELAPSED_SECS", "60"),
            ("DDNS_SCHEDULE_TIME", "06:30"),
            ("DDNS_TIMEZONE", "America/New_York"),
            ("DDNS_RUN_ONCE", "true"),
            ("DDNS_HEALTH_ADDR", "127.0.0.1:9000"),
            ("DDNS_HEALTH_ENABLED", "false"),
            ("DDNS_MODE", "dry-run"),
            ("DDNS_LOG_FORMAT", "json"),
            ("DDNS_LOG_LEVEL", "debug"),
        ]);

        let config = load(&vars).unwrap();
        config.validate().unwrap();

        assert_eq!(config.ddns.address_source.url, "http://127.0.0.1:8080/ip");
        assert_eq!(config.ddns.provider.url, "http://127.0.0.1:8080/dyndns");
        assert_eq!(config.ddns.provider.request_timeout, Duration::from_secs(3));
        assert_eq!(config.ddns.retry.max_elapsed_time, Duration::from_secs(60));
        assert_eq!(config.ddns.schedule.hour_minute().unwrap(), (6, 30));
        assert!(config.ddns.schedule.run_once);
        assert!(!config.ddns.health.enabled);
        assert_eq!(config.ddns.health.bind.port(), 9000);
        assert!(config.ddns.provider.dry_run);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DDNS_MODE", "staging"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn sealed_api_key_is_opened() {
        let sealed = seal("zonomi-secret", TEST_KEY);
        let config = load(&[
            ("DDNS_PROVIDER_API_KEY", sealed.as_str()),
            ("DDNS_PROVIDER_API_KEY_ENCRYPTED", "true"),
            ("DDNS_ENCRYPTION_KEY", TEST_KEY),
            ("DDNS_HOSTS", "home.example.com"),
        ])
        .unwrap();

        assert_eq!(config.ddns.provider.api_key, "zonomi-secret");
    }

    #[test]
    fn sealed_api_key_without_encryption_key_is_an_error() {
        let err = load(&[
            ("DDNS_PROVIDER_API_KEY", "c2VhbGVk"),
            ("DDNS_PROVIDER_API_KEY_ENCRYPTED", "true"),
            ("DDNS_HOSTS", "home.example.com"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("DDNS_ENCRYPTION_KEY"));
    }

    #[test]
    fn invalid_host_name_fails_validation() {
        let config = load(&[
            ("DDNS_PROVIDER_API_KEY", "k"),
            ("DDNS_HOSTS", "home..example.com"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_timezone_fails_validation() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DDNS_TIMEZONE", "Mars/Olympus_Mons"));
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn request_timeout_must_fit_retry_budget() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DDNS_REQUEST_TIMEOUT_SECS", "30"));
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = load(MINIMAL).unwrap();
        assert!(!format!("{:?}", config).contains("plain-key"));
    }
}
