use crate::adapter::{HealthReport, HealthStatus};
use crate::registry::TransportRegistry;
use serde::Deserialize;
use shunt_core::eq_names;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The policy of the [`HealthAggregator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HealthConfig {
    /// The per-adapter check timeout; a check that overruns it counts as
    /// unhealthy.
    #[serde(deserialize_with = "shunt_core::serde_duration::deserialize")]
    pub check_timeout: Duration,
    /// Whether an empty registry counts as unhealthy.
    pub require_at_least_one_transport: bool,
    /// Whether an unhealthy default transport downgrades a mixed verdict
    /// from degraded to unhealthy.
    pub require_default_transport_healthy: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            require_at_least_one_transport: false,
            require_default_transport_healthy: false,
        }
    }
}

impl AsRef<HealthConfig> for HealthConfig {
    fn as_ref(&self) -> &HealthConfig {
        self
    }
}

/// The aggregate verdict over every registered transport, with the
/// per-adapter reports that produced it.
#[derive(Debug, Clone)]
pub struct AggregateHealth {
    status: HealthStatus,
    reports: Vec<(String, HealthReport)>,
}

impl AggregateHealth {
    /// Reports the aggregate verdict.
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Exposes the per-adapter reports.
    pub fn reports(&self) -> &[(String, HealthReport)] {
        &self.reports
    }

    /// Returns the report of the named adapter, if it was checked.
    pub fn report_for(&self, name: &str) -> Option<&HealthReport> {
        self.reports
            .iter()
            .find(|(reported, _)| eq_names(reported, name))
            .map(|(_, report)| report)
    }
}

/// Runs per-adapter health checks concurrently and folds them into one
/// verdict.
///
/// ## Verdict table
///
/// | Observation | Verdict |
/// |---|---|
/// | Nothing registered, none required | healthy |
/// | Nothing registered, at least one required | unhealthy |
/// | Every adapter healthy | healthy |
/// | Mixed, default healthy or not required | degraded |
/// | Mixed, default required healthy but unhealthy | unhealthy |
/// | Every adapter unhealthy | unhealthy |
///
/// A check that panics or overruns the timeout counts as unhealthy for its
/// adapter without aborting the aggregation. Adapters without a health facet
/// report by liveness: running is healthy, stopped is not.
pub struct HealthAggregator {
    registry: Arc<TransportRegistry>,
    config: HealthConfig,
}

impl HealthAggregator {
    /// Creates an aggregator over the given registry and policy.
    pub fn new(registry: Arc<TransportRegistry>, config: impl AsRef<HealthConfig>) -> Self {
        Self {
            registry,
            config: config.as_ref().clone(),
        }
    }

    /// Checks every registered adapter concurrently and aggregates the
    /// verdict.
    pub async fn check(&self, token: &CancellationToken) -> AggregateHealth {
        let registrations = self.registry.all_transports();

        if registrations.is_empty() {
            let status = if self.config.require_at_least_one_transport {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Healthy
            };

            return AggregateHealth {
                status,
                reports: Vec::new(),
            };
        }

        // Each check runs on its own task so that a panicking adapter
        // cannot take the aggregation down with it
        let handles: Vec<_> = registrations
            .iter()
            .map(|registration| {
                let adapter = Arc::clone(registration.adapter());
                let name = registration.name().to_owned();
                let timeout = self.config.check_timeout;
                let token = token.clone();

                let handle = tokio::spawn(async move {
                    let started = Instant::now();

                    let report = match adapter.health() {
                        Some(health) => {
                            match tokio::time::timeout(timeout, health.check(&token)).await {
                                Ok(report) => report,
                                Err(_) => HealthReport::unhealthy(
                                    "health check timed out",
                                    "timeout",
                                ),
                            }
                        }
                        None if adapter.is_running() => {
                            HealthReport::healthy("running (no health probe)", "liveness")
                        }
                        None => HealthReport::unhealthy("stopped (no health probe)", "liveness"),
                    };

                    report.with_duration(started.elapsed())
                });

                (name, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(join_error) => {
                    warn!(
                        transport = name.as_str(),
                        %join_error,
                        "Health check task failed",
                    );

                    HealthReport::unhealthy(
                        format!("health check panicked: {}", join_error),
                        "panic",
                    )
                }
            };

            reports.push((name, report));
        }

        let status = self.aggregate(&reports);

        AggregateHealth { status, reports }
    }

    /// Folds the per-adapter reports into the aggregate verdict.
    fn aggregate(&self, reports: &[(String, HealthReport)]) -> HealthStatus {
        let healthy = reports
            .iter()
            .filter(|(_, report)| report.status() == HealthStatus::Healthy)
            .count();

        if healthy == reports.len() {
            return HealthStatus::Healthy;
        }
        if healthy == 0 {
            return HealthStatus::Unhealthy;
        }

        // Mixed bag: the default transport's own health decides how bad
        let default_unhealthy = self
            .registry
            .default_transport_name()
            .and_then(|default| {
                reports
                    .iter()
                    .find(|(name, _)| eq_names(name, &default))
                    .map(|(_, report)| report.status() != HealthStatus::Healthy)
            })
            .unwrap_or(false);

        if self.config.require_default_transport_healthy && default_unhealthy {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{TransportAdapter, TransportType};
    use crate::adapters::in_memory::InMemoryTransport;
    use pretty_assertions::assert_eq;
    use shunt_core::PropertyMap;

    fn make_registry_with(running: &[(&str, bool)]) -> Arc<TransportRegistry> {
        let registry = Arc::new(TransportRegistry::new());

        for (name, _) in running {
            registry
                .register_transport(
                    name,
                    Arc::new(InMemoryTransport::new(*name)) as Arc<dyn TransportAdapter>,
                    TransportType::InMemory,
                    PropertyMap::new(),
                )
                .unwrap();
        }

        registry
    }

    async fn start_adapter(registry: &TransportRegistry, name: &str) {
        registry
            .get_transport_adapter(name)
            .unwrap()
            .start()
            .await
            .unwrap();
    }

    fn require_default_healthy() -> HealthConfig {
        serde_json::from_str(r#"{"require_default_transport_healthy": true}"#).unwrap()
    }

    #[tokio::test]
    async fn an_empty_registry_is_healthy_unless_required_otherwise() {
        // Given
        let registry = Arc::new(TransportRegistry::new());

        // Then: lenient policy
        let lenient = HealthAggregator::new(Arc::clone(&registry), HealthConfig::default());
        assert_eq!(
            lenient.check(&CancellationToken::new()).await.status(),
            HealthStatus::Healthy,
        );

        // And: strict policy
        let config: HealthConfig =
            serde_json::from_str(r#"{"require_at_least_one_transport": true}"#).unwrap();
        let strict = HealthAggregator::new(registry, config);
        assert_eq!(
            strict.check(&CancellationToken::new()).await.status(),
            HealthStatus::Unhealthy,
        );
    }

    #[tokio::test]
    async fn all_healthy_aggregates_healthy() {
        // Given
        let registry = make_registry_with(&[("rabbit", true), ("kafka", true)]);
        start_adapter(&registry, "rabbit").await;
        start_adapter(&registry, "kafka").await;

        // When
        let aggregate = HealthAggregator::new(registry, HealthConfig::default())
            .check(&CancellationToken::new())
            .await;

        // Then
        assert_eq!(aggregate.status(), HealthStatus::Healthy);
        assert_eq!(aggregate.reports().len(), 2);
    }

    #[tokio::test]
    async fn a_mixed_bag_with_a_healthy_default_is_degraded() {
        // Given: rabbit healthy, kafka unhealthy, default rabbit
        let registry = make_registry_with(&[("rabbit", true), ("kafka", false)]);
        start_adapter(&registry, "rabbit").await;
        registry.set_default_transport("rabbit").unwrap();

        // When
        let aggregate = HealthAggregator::new(Arc::clone(&registry), require_default_healthy())
            .check(&CancellationToken::new())
            .await;

        // Then
        assert_eq!(aggregate.status(), HealthStatus::Degraded);
        assert_eq!(
            aggregate.report_for("kafka").unwrap().status(),
            HealthStatus::Unhealthy,
        );
    }

    #[tokio::test]
    async fn a_mixed_bag_with_an_unhealthy_required_default_is_unhealthy() {
        // Given: same bag, but the default is the unhealthy one
        let registry = make_registry_with(&[("rabbit", true), ("kafka", false)]);
        start_adapter(&registry, "rabbit").await;
        registry.set_default_transport("kafka").unwrap();

        // When
        let aggregate = HealthAggregator::new(Arc::clone(&registry), require_default_healthy())
            .check(&CancellationToken::new())
            .await;

        // Then
        assert_eq!(aggregate.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn a_mixed_bag_without_the_default_requirement_stays_degraded() {
        // Given
        let registry = make_registry_with(&[("rabbit", true), ("kafka", false)]);
        start_adapter(&registry, "rabbit").await;
        registry.set_default_transport("kafka").unwrap();

        // When
        let aggregate = HealthAggregator::new(Arc::clone(&registry), HealthConfig::default())
            .check(&CancellationToken::new())
            .await;

        // Then
        assert_eq!(aggregate.status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn all_unhealthy_aggregates_unhealthy() {
        // Given: nothing started
        let registry = make_registry_with(&[("rabbit", false), ("kafka", false)]);

        // When
        let aggregate = HealthAggregator::new(registry, HealthConfig::default())
            .check(&CancellationToken::new())
            .await;

        // Then
        assert_eq!(aggregate.status(), HealthStatus::Unhealthy);
    }
}
