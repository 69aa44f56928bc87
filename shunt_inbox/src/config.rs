use serde::Deserialize;
use std::time::Duration;

/// The configuration section of an [`InboxStore`](crate::InboxStore).
///
/// Durations accept humantime strings (`"30s"`, `"24h"`) or bare seconds.
///
/// ## Example
///
/// ```
/// use shunt_inbox::InboxConfig;
///
/// let config: InboxConfig = serde_json::from_str(
///     r#"{
///         "max_entries": 10000,
///         "retention": "24h",
///         "auto_cleanup": true,
///         "cleanup_interval": "5m"
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(config.max_entries, Some(10000));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct InboxConfig {
    /// The soft cap on stored entries. When exceeded, a background trim
    /// removes the oldest entries; observers may transiently see more
    /// entries than the cap.
    pub max_entries: Option<usize>,
    /// How long finished (processed or failed) entries are retained before
    /// cleanup removes them. Pending entries are never cleaned.
    #[serde(deserialize_with = "shunt_core::serde_duration::deserialize")]
    pub retention: Duration,
    /// Whether a background task invokes cleanup periodically. Manual
    /// cleanup works either way.
    pub auto_cleanup: bool,
    /// How often the background cleanup runs, when enabled.
    #[serde(deserialize_with = "shunt_core::serde_duration::deserialize")]
    pub cleanup_interval: Duration,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            retention: Duration::from_secs(24 * 60 * 60),
            auto_cleanup: false,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl AsRef<InboxConfig> for InboxConfig {
    fn as_ref(&self) -> &InboxConfig {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_yields_defaults() {
        // Given
        let input = "{}";

        // When
        let config: InboxConfig = serde_json::from_str(input).unwrap();

        // Then
        assert_eq!(config.max_entries, None);
        assert_eq!(config.retention, Duration::from_secs(24 * 60 * 60));
        assert!(!config.auto_cleanup);
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
    }

    #[test]
    fn durations_parse_from_humantime() {
        // Given
        let input = r#"{"retention": "90m", "cleanup_interval": 30}"#;

        // When
        let config: InboxConfig = serde_json::from_str(input).unwrap();

        // Then
        assert_eq!(config.retention, Duration::from_secs(90 * 60));
        assert_eq!(config.cleanup_interval, Duration::from_secs(30));
    }
}
