use crate::adapter::{
    HealthReport, HealthStatus, TransportAdapter, TransportHealth, TransportType,
};
use crate::message::TransportMessage;
use async_trait::async_trait;
use dashmap::DashMap;
use shunt_core::{DispatchError, DispatchResult, ErrorKind, InboundDispatcher};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// An in-process loop-back transport.
///
/// Outbound messages queue under their destination name; inbound delivery
/// goes straight through the dispatcher. Useful as the default transport of
/// single-process deployments and as the test double for everything that
/// speaks the adapter contract.
pub struct InMemoryTransport {
    name: String,
    running: AtomicBool,
    queues: DashMap<String, VecDeque<TransportMessage>>,
}

impl InMemoryTransport {
    /// Creates a stopped loop-back transport with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: AtomicBool::new(false),
            queues: DashMap::new(),
        }
    }

    /// Drains and returns every message queued under the given destination.
    pub fn drain(&self, destination: &str) -> Vec<TransportMessage> {
        match self.queues.get_mut(destination) {
            Some(mut queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Reports the number of messages queued under the given destination.
    pub fn queued(&self, destination: &str) -> usize {
        self.queues
            .get(destination)
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    fn total_queued(&self) -> usize {
        self.queues.iter().map(|queue| queue.len()).sum()
    }
}

#[async_trait]
impl TransportAdapter for InMemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn transport_type(&self) -> TransportType {
        TransportType::InMemory
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn supports_publishing(&self) -> bool {
        true
    }

    fn supports_subscription(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), DispatchError> {
        self.running.store(true, Ordering::Release);

        Ok(())
    }

    async fn stop(&self) -> Result<(), DispatchError> {
        self.running.store(false, Ordering::Release);

        Ok(())
    }

    async fn send(
        &self,
        message: TransportMessage,
        destination: &str,
        token: &CancellationToken,
    ) -> DispatchResult {
        if token.is_cancelled() {
            return DispatchResult::failure(ErrorKind::Cancelled, "send cancelled");
        }

        if !self.is_running() {
            return DispatchResult::failure(
                ErrorKind::ConfigurationError,
                format!("transport '{}' is not started", self.name),
            );
        }

        trace!(
            transport = self.name.as_str(),
            destination,
            "Queued loop-back message",
        );

        self.queues
            .entry(destination.to_owned())
            .or_default()
            .push_back(message);

        DispatchResult::success()
    }

    async fn receive(
        &self,
        message: TransportMessage,
        dispatcher: &dyn InboundDispatcher,
        token: &CancellationToken,
    ) -> DispatchResult {
        let mut context = message.build_context(&self.name);

        dispatcher
            .dispatch(std::sync::Arc::new(message), &mut context, token)
            .await
    }

    async fn subscribe(
        &self,
        subscription: &str,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.queues.entry(subscription.to_owned()).or_default();

        Ok(())
    }

    async fn unsubscribe(
        &self,
        subscription: &str,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.queues.remove(subscription);

        Ok(())
    }

    fn health(&self) -> Option<&dyn TransportHealth> {
        Some(self)
    }
}

impl TransportHealth for InMemoryTransport {
    fn quick_check(&self) -> HealthReport {
        let report = if self.is_running() {
            HealthReport::new(HealthStatus::Healthy, "loop-back running", "loopback")
        } else {
            HealthReport::new(HealthStatus::Unhealthy, "loop-back stopped", "loopback")
        };

        report.with_metric("queued_messages", self.total_queued() as f64)
    }
}
