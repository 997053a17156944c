//! Domain values shared by every stage of a cycle

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A public network address as reported by the address source
///
/// Treated as an opaque string: it is compared verbatim and never parsed
/// or normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One persisted log record: an address and when it was observed
///
/// Serialized as `{"ip": "<address>", "timestamp": "<RFC3339>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "ip")]
    address: Address,
    #[serde(rename = "timestamp", with = "rfc3339")]
    observed_at: DateTime<Utc>,
}

impl Observation {
    /// Create an observation stamped with the current time
    pub fn now(address: Address) -> Self {
        Self::at(address, Utc::now())
    }

    pub fn at(address: Address, observed_at: DateTime<Utc>) -> Self {
        Self {
            address,
            observed_at,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Seconds-precision RFC3339 on write; any RFC3339 offset accepted on read
mod rfc3339 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
