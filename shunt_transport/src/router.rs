use shunt_core::{DispatchContext, DispatchResult, Dispatchable, ErrorKind, InboundDispatcher};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Routes inbound transport messages into the dispatch pipeline.
///
/// The router is the one place where a message leaves the transport layer:
/// it stamps the source transport onto the context and forwards to the
/// configured [`InboundDispatcher`]. Everything downstream — inbox
/// deduplication, chain execution, handler resolution — is the dispatcher's
/// business.
pub struct TransportRouter {
    dispatcher: Arc<dyn InboundDispatcher>,
}

impl TransportRouter {
    /// Creates a router forwarding to the given dispatcher.
    pub fn new(dispatcher: Arc<dyn InboundDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Exposes the configured dispatcher.
    pub fn dispatcher(&self) -> &Arc<dyn InboundDispatcher> {
        &self.dispatcher
    }

    /// Forwards one inbound message, parameterized by the name of the
    /// adapter that produced it.
    ///
    /// An empty adapter name fails with
    /// [`InvalidArgument`](ErrorKind::InvalidArgument); message and context
    /// non-nullity is enforced by construction.
    pub async fn route(
        &self,
        message: Arc<dyn Dispatchable>,
        mut context: DispatchContext,
        adapter_name: &str,
        token: &CancellationToken,
    ) -> DispatchResult {
        if adapter_name.trim().is_empty() {
            return DispatchResult::failure(
                ErrorKind::InvalidArgument,
                "adapter name must not be empty",
            );
        }

        context.set_source_transport(adapter_name);

        trace!(
            message_id = context.message_id(),
            adapter = adapter_name,
            "Routing inbound message",
        );

        self.dispatcher.dispatch(message, &mut context, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    struct PingCommand;
    impl Dispatchable for PingCommand {}

    /// A dispatcher that records what reached it.
    struct RecordingDispatcher {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl InboundDispatcher for RecordingDispatcher {
        async fn dispatch(
            &self,
            _message: Arc<dyn Dispatchable>,
            context: &mut DispatchContext,
            _token: &CancellationToken,
        ) -> DispatchResult {
            self.seen.lock().push((
                context.message_id().to_owned(),
                context.source_transport().map(str::to_owned),
            ));

            DispatchResult::success()
        }
    }

    #[tokio::test]
    async fn forwards_with_the_source_transport_stamped() {
        // Given
        let dispatcher = Arc::new(RecordingDispatcher {
            seen: Mutex::new(Vec::new()),
        });
        let router = TransportRouter::new(Arc::clone(&dispatcher) as Arc<dyn InboundDispatcher>);

        // When
        let result = router
            .route(
                Arc::new(PingCommand),
                DispatchContext::with_message_id("m-1"),
                "rabbit",
                &CancellationToken::new(),
            )
            .await;

        // Then
        assert!(result.succeeded());
        assert_eq!(
            *dispatcher.seen.lock(),
            vec![("m-1".to_owned(), Some("rabbit".to_owned()))],
        );
    }

    #[tokio::test]
    async fn an_empty_adapter_name_is_rejected() {
        // Given
        let dispatcher = Arc::new(RecordingDispatcher {
            seen: Mutex::new(Vec::new()),
        });
        let router = TransportRouter::new(Arc::clone(&dispatcher) as Arc<dyn InboundDispatcher>);

        // When
        let result = router
            .route(
                Arc::new(PingCommand),
                DispatchContext::with_message_id("m-2"),
                " ",
                &CancellationToken::new(),
            )
            .await;

        // Then
        assert!(!result.succeeded());
        assert_eq!(
            result.error().unwrap().kind(),
            ErrorKind::InvalidArgument,
        );
        assert!(dispatcher.seen.lock().is_empty());
    }
}
