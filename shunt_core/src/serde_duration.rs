//! Serde support for durations in configuration sections.
//!
//! Accepts either a human-readable string (`"30s"`, `"5m"`, `"1h 30m"`) or a
//! bare number of seconds. Intended for use with `#[serde(with = ...)]` or
//! `#[serde(deserialize_with = ...)]` on `Duration` fields.

use serde::Deserializer;
use serde::de::{Error, Visitor};
use std::fmt::Formatter;
use std::time::Duration;

/// Deserializes a [`Duration`] from a humantime string or a number of
/// seconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a duration string (e.g. '30s') or a number of seconds")
    }

    fn visit_str<E>(self, input: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        humantime::parse_duration(input).map_err(E::custom)
    }

    fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(Duration::from_secs(seconds))
    }

    fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        u64::try_from(seconds)
            .map(Duration::from_secs)
            .map_err(|_| E::custom("duration must not be negative"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "super::deserialize")]
        interval: Duration,
    }

    #[test]
    fn parses_humantime_strings() {
        // Given
        let input = r#"{"interval": "1m 30s"}"#;

        // When
        let probe: Probe = serde_json::from_str(input).unwrap();

        // Then
        assert_eq!(probe.interval, Duration::from_secs(90));
    }

    #[test]
    fn parses_bare_seconds() {
        // Given
        let input = r#"{"interval": 45}"#;

        // When
        let probe: Probe = serde_json::from_str(input).unwrap();

        // Then
        assert_eq!(probe.interval, Duration::from_secs(45));
    }
}
