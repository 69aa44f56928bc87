use serde::Deserialize;

/// The configuration section of a
/// [`CorrelationIndex`](crate::CorrelationIndex).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SagaIndexConfig {
    /// Whether queries return sagas in the
    /// [`Completed`](crate::SagaStatus::Completed) state. Off by default:
    /// a finished saga is usually no longer a correlation target.
    pub include_completed: bool,
    /// The cap on the number of records any single query returns.
    pub max_results: usize,
}

impl Default for SagaIndexConfig {
    fn default() -> Self {
        Self {
            include_completed: false,
            max_results: 100,
        }
    }
}

impl AsRef<SagaIndexConfig> for SagaIndexConfig {
    fn as_ref(&self) -> &SagaIndexConfig {
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
        let config: SagaIndexConfig = serde_json::from_str(input).unwrap();

        // Then
        assert!(!config.include_completed);
        assert_eq!(config.max_results, 100);
    }
}
