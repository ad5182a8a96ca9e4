//! Quota reset timestamps.
//!
//! Providers report "quota resets at" in three wire encodings: integer
//! seconds, integer milliseconds, or an ISO-8601 string. [`ResetTime`] keeps
//! the encoding as a tag and [`ResetTime::to_epoch_secs`] resolves all of
//! them to epoch seconds.

use chrono::DateTime;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Integer timestamps at or above this magnitude are milliseconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// A reset timestamp as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTime {
    /// Seconds since the Unix epoch.
    Seconds(i64),
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// An ISO-8601 / RFC 3339 timestamp, e.g. `2026-02-01T00:00:00Z`.
    Iso8601(String),
}

impl ResetTime {
    /// Classifies an integer timestamp by magnitude.
    pub fn from_integer(value: i64) -> Self {
        if value.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
            Self::Millis(value)
        } else {
            Self::Seconds(value)
        }
    }

    /// Resolves the timestamp to epoch seconds.
    ///
    /// Unparsable strings resolve to `None`.
    pub fn to_epoch_secs(&self) -> Option<i64> {
        match self {
            Self::Seconds(secs) => Some(*secs),
            Self::Millis(millis) => Some(millis.div_euclid(1000)),
            Self::Iso8601(text) => match DateTime::parse_from_rfc3339(text.trim()) {
                Ok(dt) => Some(dt.timestamp()),
                Err(e) => {
                    debug!(value = %text, error = %e, "Unparsable reset timestamp");
                    None
                }
            },
        }
    }
}

/// Untagged wire shape accepted by the deserializer.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireReset {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ResetTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[allow(clippy::cast_possible_truncation)]
        let reset = match WireReset::deserialize(deserializer)? {
            WireReset::Int(value) => Self::from_integer(value),
            WireReset::Float(value) => Self::from_integer(value.trunc() as i64),
            WireReset::Text(text) => match text.trim().parse::<i64>() {
                Ok(value) => Self::from_integer(value),
                Err(_) => Self::Iso8601(text),
            },
        };
        Ok(reset)
    }
}
