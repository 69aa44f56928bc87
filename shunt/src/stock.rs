use async_trait::async_trait;
use shunt_core::{DispatchContext, DispatchResult, Dispatchable, headers};
use shunt_metrics::MetricRegistry;
use shunt_pipeline::{Middleware, MiddlewareStage, Next};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Ensures every dispatch carries a correlation chain.
///
/// A context without a correlation ID adopts its own message ID as the root
/// of a new chain. Both the correlation ID and the causation ID (when
/// present) are mirrored into their well-known headers so they survive the
/// trip across any transport.
pub struct CorrelationMiddleware;

#[async_trait]
impl Middleware for CorrelationMiddleware {
    fn stage(&self) -> MiddlewareStage {
        MiddlewareStage::PreProcessing
    }

    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult {
        if context.correlation_id().is_none() {
            let root = context.message_id().to_owned();
            context.set_correlation_id(root);
        }

        let correlation_id = context.correlation_id().map(str::to_owned);
        let causation_id = context.causation_id().map(str::to_owned);

        if let Some(correlation_id) = correlation_id {
            // The well-known header names are never empty
            let _ = context
                .headers_mut()
                .set(headers::CORRELATION_ID, Some(correlation_id));
        }
        if let Some(causation_id) = causation_id {
            let _ = context
                .headers_mut()
                .set(headers::CAUSATION_ID, Some(causation_id));
        }

        next.run(message, context, token).await
    }
}

/// Logs the boundaries of every dispatch.
///
/// Successes log at `debug`; failures log at `warn` with the error
/// descriptor attached.
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    fn stage(&self) -> MiddlewareStage {
        MiddlewareStage::PreProcessing
    }

    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult {
        debug!(
            message_id = context.message_id(),
            kind = %message.kind(),
            "Dispatch started",
        );

        let started = Instant::now();
        let result = next.run(message, context, token).await;
        let elapsed = started.elapsed();

        if result.succeeded() {
            debug!(
                message_id = context.message_id(),
                elapsed_us = elapsed.as_micros() as u64,
                "Dispatch completed",
            );
        } else {
            warn!(
                message_id = context.message_id(),
                elapsed_us = elapsed.as_micros() as u64,
                error = ?result.error(),
                "Dispatch failed",
            );
        }

        result
    }
}

/// Records dispatch timings and outcomes on a metric registry.
///
/// One histogram (`shunt_dispatch_duration_us`) holds the end-to-end
/// timings; one labeled counter (`shunt_dispatches_by_kind`) slices dispatch
/// counts by message kind and outcome.
pub struct MetricsMiddleware {
    registry: &'static MetricRegistry,
}

impl MetricsMiddleware {
    /// Creates the middleware over the global metric registry.
    pub fn new() -> Self {
        Self::with_registry(MetricRegistry::global())
    }

    /// Creates the middleware over the given registry.
    pub fn with_registry(registry: &'static MetricRegistry) -> Self {
        Self { registry }
    }
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult {
        let started = Instant::now();
        let result = next.run(message, context, token).await;
        let elapsed = started.elapsed();

        self.registry
            .histogram("shunt_dispatch_duration_us")
            .record(elapsed.as_micros() as u64);

        let kind = message.kind().to_string();
        let outcome = if result.succeeded() { "success" } else { "failure" };
        self.registry
            .labeled_counter("shunt_dispatches_by_kind", &["kind", "outcome"])
            .inc(&[&kind, outcome]);

        result
    }
}
