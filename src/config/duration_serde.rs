//! Serde helpers for human-readable durations in configuration.
//!
//! Accepts either a number of seconds (`3600`) or a humantime string
//! (`"1h"`, `"5m"`, `"1h30m"`). Zero is a valid value and is used to disable
//! periodic work.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.is_zero() {
        return serializer.serialize_u64(0);
    }
    let duration_str = humantime::format_duration(*duration).to_string();
    serializer.serialize_str(&duration_str)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration as seconds (number) or human-readable string (e.g., '5m', '1h30m')")
        }

        fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(seconds))
        }

        fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            // Negative intervals disable periodic work, same as zero
            Ok(Duration::from_secs(seconds.max(0) as u64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = value.trim();
            if let Ok(seconds) = trimmed.parse::<i64>() {
                return self.visit_i64(seconds);
            }
            humantime::parse_duration(trimmed)
                .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
