//! Timestamp encoding for snapshots.
//!
//! Timestamps are written as RFC 3339 in UTC. Reading also accepts naive
//! ISO-8601 values without an offset, as produced by older data files; those
//! are taken to be local time.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Time;

/// Parse an RFC 3339 or naive ISO-8601 timestamp.
pub fn parse(s: &str) -> Result<Time, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive: NaiveDateTime = s
        .parse()
        .map_err(|e| format!("invalid timestamp '{s}': {e}"))?;

    // Skipped local times (DST gaps) fall back to reading the value as UTC.
    Ok(match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    })
}

/// Format a timestamp the way snapshots store it.
pub fn format(time: &Time) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `#[serde(with = "timestamp")]` support.
pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(time))
}

/// `#[serde(with = "timestamp")]` support.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Same encoding for optional timestamps.
pub mod option {
    use super::*;

    /// `#[serde(with = "timestamp::option")]` support.
    pub fn serialize<S: Serializer>(time: &Option<Time>, serializer: S) -> Result<S::Ok, S::Error> {
        time.as_ref().map(super::format).serialize(serializer)
    }

    /// `#[serde(with = "timestamp::option")]` support.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Time>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
