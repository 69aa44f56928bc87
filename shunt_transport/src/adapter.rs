use crate::message::TransportMessage;
use async_trait::async_trait;
use shunt_core::{DispatchError, DispatchResult, InboundDispatcher};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The kind of external message substrate an adapter connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// RabbitMQ (AMQP).
    RabbitMq,
    /// Apache Kafka.
    Kafka,
    /// Azure Service Bus.
    AzureServiceBus,
    /// AWS Simple Queue Service.
    AwsSqs,
    /// AWS Simple Notification Service.
    AwsSns,
    /// Google Cloud Pub/Sub.
    GooglePubSub,
    /// gRPC streaming.
    Grpc,
    /// In-process loop-back.
    InMemory,
    /// Schedule-driven synthetic messages.
    Cron,
}

impl Display for TransportType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportType::RabbitMq => "rabbitmq",
            TransportType::Kafka => "kafka",
            TransportType::AzureServiceBus => "azure-service-bus",
            TransportType::AwsSqs => "aws-sqs",
            TransportType::AwsSns => "aws-sns",
            TransportType::GooglePubSub => "google-pubsub",
            TransportType::Grpc => "grpc",
            TransportType::InMemory => "in-memory",
            TransportType::Cron => "cron",
        };

        f.write_str(name)
    }
}

/// A connector to one external message substrate.
///
/// Adapters are registered with the
/// [`TransportRegistry`](crate::TransportRegistry) under a name, started and
/// stopped by the owning application, and consulted by the router and the
/// multi-transport surface. Wire protocols and framing live behind this
/// contract, not in this crate.
#[async_trait]
pub trait TransportAdapter: Send + Sync + 'static {
    /// Reports the name this adapter identifies itself by.
    fn name(&self) -> &str;

    /// Reports the substrate this adapter connects to.
    fn transport_type(&self) -> TransportType;

    /// Reports whether this adapter is currently running.
    fn is_running(&self) -> bool;

    /// Reports whether this adapter can publish outbound messages.
    fn supports_publishing(&self) -> bool {
        false
    }

    /// Reports whether this adapter can maintain inbound subscriptions.
    fn supports_subscription(&self) -> bool {
        false
    }

    /// Performs one-time setup before the first start. The default is a
    /// no-op.
    async fn initialize(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Starts the adapter.
    async fn start(&self) -> Result<(), DispatchError>;

    /// Stops the adapter.
    async fn stop(&self) -> Result<(), DispatchError>;

    /// Sends an outbound message to the given destination on this
    /// substrate.
    async fn send(
        &self,
        message: TransportMessage,
        destination: &str,
        token: &CancellationToken,
    ) -> DispatchResult;

    /// Delivers an inbound message into the dispatch pipeline through the
    /// given dispatcher.
    async fn receive(
        &self,
        message: TransportMessage,
        dispatcher: &dyn InboundDispatcher,
        token: &CancellationToken,
    ) -> DispatchResult;

    /// Establishes an inbound subscription under the given name.
    ///
    /// The default fails: an adapter that supports subscriptions overrides
    /// this.
    async fn subscribe(
        &self,
        subscription: &str,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        Err(DispatchError::invalid_argument(format!(
            "transport '{}' does not support subscription '{}'",
            self.name(),
            subscription,
        )))
    }

    /// Tears down the inbound subscription with the given name. Unknown
    /// subscriptions are a no-op.
    async fn unsubscribe(
        &self,
        _subscription: &str,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Exposes the health facet of this adapter, when it has one.
    fn health(&self) -> Option<&dyn TransportHealth> {
        None
    }
}

/// The health facet of a health-capable transport adapter.
#[async_trait]
pub trait TransportHealth: Send + Sync {
    /// Produces a cheap, synchronous health verdict from already-known
    /// state.
    fn quick_check(&self) -> HealthReport;

    /// Produces a health verdict, potentially probing the substrate. The
    /// default answers with the quick check.
    async fn check(&self, _token: &CancellationToken) -> HealthReport {
        self.quick_check()
    }
}

/// The verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational with reduced capability.
    Degraded,
    /// Not operational.
    Unhealthy,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };

        f.write_str(name)
    }
}

/// The outcome of one health check: the verdict plus supporting detail.
#[derive(Debug, Clone)]
pub struct HealthReport {
    status: HealthStatus,
    description: String,
    category: String,
    duration: Duration,
    metrics: HashMap<String, f64>,
}

impl HealthReport {
    /// Creates a report with the given verdict and detail.
    pub fn new(
        status: HealthStatus,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            status,
            description: description.into(),
            category: category.into(),
            duration: Duration::ZERO,
            metrics: HashMap::new(),
        }
    }

    /// Shorthand for a healthy report.
    pub fn healthy(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(HealthStatus::Healthy, description, category)
    }

    /// Shorthand for an unhealthy report.
    pub fn unhealthy(description: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy, description, category)
    }

    /// Records how long the check took.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;

        self
    }

    /// Attaches a supporting metric.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);

        self
    }

    /// Reports the verdict.
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Reports the human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Reports the check category (for example `"broker"` or
    /// `"loopback"`).
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Reports how long the check took.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Exposes the supporting metrics.
    pub fn metrics(&self) -> &HashMap<String, f64> {
        &self.metrics
    }
}
