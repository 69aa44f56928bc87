use crate::adapter::TransportAdapter;
use crate::message::TransportMessage;
use crate::registry::TransportRegistry;
use futures::future::join_all;
use shunt_core::{DispatchError, DispatchResult, ErrorKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The aggregate publish/subscribe surface over every registered transport.
///
/// Publishing forwards to the default transport. Subscription names may
/// carry a scheme — `"kafka://orders"` subscribes `orders` on the transport
/// registered as `kafka` — while scheme-less names go to the default
/// transport. Lifecycle operations fan out to all adapters concurrently.
pub struct MultiTransportAdapter {
    registry: Arc<TransportRegistry>,
}

impl MultiTransportAdapter {
    /// Creates the aggregate surface over the given registry.
    pub fn new(registry: Arc<TransportRegistry>) -> Self {
        Self { registry }
    }

    /// Exposes the underlying registry.
    pub fn registry(&self) -> &Arc<TransportRegistry> {
        &self.registry
    }

    /// Reports whether any registered adapter can publish.
    pub fn supports_publishing(&self) -> bool {
        self.registry
            .all_transports()
            .iter()
            .any(|registration| registration.adapter().supports_publishing())
    }

    /// Reports whether any registered adapter can subscribe.
    pub fn supports_subscription(&self) -> bool {
        self.registry
            .all_transports()
            .iter()
            .any(|registration| registration.adapter().supports_subscription())
    }

    /// Publishes through the default transport.
    ///
    /// When no default is designated this returns a failure result — it
    /// never panics, and an empty registry is just the emptiest case of the
    /// same failure.
    pub async fn publish(
        &self,
        message: TransportMessage,
        destination: &str,
        token: &CancellationToken,
    ) -> DispatchResult {
        match self.registry.default_transport_adapter() {
            Some(adapter) => adapter.send(message, destination, token).await,
            None => {
                let detail = if self.registry.is_empty() {
                    "no transports are registered"
                } else {
                    "no default transport is designated; call set_default_transport(name)"
                };

                DispatchResult::failure(
                    ErrorKind::ConfigurationError,
                    format!("cannot publish to '{}': {}", destination, detail),
                )
            }
        }
    }

    /// Subscribes under the given name, routed by its scheme.
    ///
    /// An unknown scheme fails with
    /// [`InvalidArgument`](ErrorKind::InvalidArgument).
    pub async fn subscribe(
        &self,
        name: &str,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let (adapter, subscription) = self.resolve(name)?;

        adapter.subscribe(&subscription, token).await
    }

    /// Unsubscribes under the given name, routed by its scheme. An unknown
    /// scheme is a silent no-op.
    pub async fn unsubscribe(
        &self,
        name: &str,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        match self.resolve(name) {
            Ok((adapter, subscription)) => adapter.unsubscribe(&subscription, token).await,
            Err(error) if error.kind() == ErrorKind::InvalidArgument => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Initializes every registered adapter concurrently.
    pub async fn initialize(&self) -> Result<(), DispatchError> {
        self.fan_out("initialize", |adapter| async move { adapter.initialize().await })
            .await
    }

    /// Starts every registered adapter concurrently.
    pub async fn start(&self) -> Result<(), DispatchError> {
        self.fan_out("start", |adapter| async move { adapter.start().await })
            .await
    }

    /// Stops every registered adapter concurrently.
    pub async fn stop(&self) -> Result<(), DispatchError> {
        self.fan_out("stop", |adapter| async move { adapter.stop().await })
            .await
    }

    /// Stops every adapter (best effort) and clears the registry.
    pub async fn dispose(&self) {
        if let Err(error) = self.stop().await {
            warn!(%error, "Some transports failed to stop during disposal");
        }

        self.registry.clear();

        info!("Disposed multi-transport surface");
    }

    /// Resolves a subscription name to its adapter and bare name.
    fn resolve(&self, name: &str) -> Result<(Arc<dyn TransportAdapter>, String), DispatchError> {
        if let Some((scheme, bare)) = name.split_once("://") {
            return match self.registry.get_transport_adapter(scheme) {
                Some(adapter) => Ok((adapter, bare.to_owned())),
                None => Err(DispatchError::invalid_argument(format!(
                    "unknown subscription scheme '{}'",
                    scheme,
                ))),
            };
        }

        match self.registry.default_transport_adapter() {
            Some(adapter) => Ok((adapter, name.to_owned())),
            None => Err(DispatchError::configuration(
                "no default transport to subscribe on; call set_default_transport(name)",
            )),
        }
    }

    /// Runs the given operation against every adapter concurrently,
    /// folding failures into one error.
    async fn fan_out<F, Fut>(&self, operation: &str, run: F) -> Result<(), DispatchError>
    where
        F: Fn(Arc<dyn TransportAdapter>) -> Fut,
        Fut: Future<Output = Result<(), DispatchError>>,
    {
        let registrations = self.registry.all_transports();

        let outcomes = join_all(registrations.iter().map(|registration| {
            let adapter = Arc::clone(registration.adapter());
            let name = registration.name().to_owned();
            let future = run(adapter);

            async move { (name, future.await) }
        }))
        .await;

        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            if let Err(error) = outcome {
                warn!(transport = name.as_str(), %error, "Transport lifecycle operation failed");
                failures.push(format!("{}: {}", name, error));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::configuration(format!(
                "failed to {} {} transport(s): {}",
                operation,
                failures.len(),
                failures.join("; "),
            )))
        }
    }
}
