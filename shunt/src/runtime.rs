use crate::handler::HandlerRegistry;
use async_trait::async_trait;
use shunt_core::{
    DispatchContext, DispatchResult, Dispatchable, ErrorKind, InboundDispatcher, TypedResult,
};
use shunt_inbox::InboxStore;
use shunt_metrics::MetricRegistry;
use shunt_pipeline::{
    ApplicabilityEvaluator, InvokerConfig, MiddlewareRegistration, PipelineInvoker,
};
use shunt_transport::TransportMessage;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// The dispatcher: the runtime's hot path.
///
/// One dispatch resolves the message's handler, records the message in the
/// inbox (when one is attached) so that the same `(message id, handler key)`
/// pair is processed at most once, drives the message through the compiled
/// middleware chain, and transitions the inbox entry to match the outcome.
///
/// The dispatcher implements [`InboundDispatcher`], which is how the
/// transport router hands it messages arriving from external substrates.
pub struct Dispatcher {
    handlers: Arc<HandlerRegistry>,
    invoker: PipelineInvoker,
    inbox: Option<Arc<InboxStore>>,
}

impl Dispatcher {
    /// Returns a new [`DispatcherBuilder`].
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Exposes the handler registry.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// Exposes the pipeline invoker.
    pub fn invoker(&self) -> &PipelineInvoker {
        &self.invoker
    }

    /// Exposes the attached inbox store, if any.
    pub fn inbox(&self) -> Option<&Arc<InboxStore>> {
        self.inbox.as_ref()
    }

    /// Pre-computes chains for every registered message type and locks the
    /// chain cache.
    pub fn freeze(&self) {
        self.invoker.freeze(self.handlers.known_messages());
    }

    /// Dispatches a message and asserts the payload type of the result.
    pub async fn dispatch_typed<R: Any + Send>(
        &self,
        message: Arc<dyn Dispatchable>,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> TypedResult<R> {
        self.dispatch(message, context, token).await.into_typed()
    }

    /// Records the inbound message in the inbox. A duplicate key
    /// short-circuits the dispatch as an already-processed success.
    fn admit_to_inbox(
        &self,
        inbox: &Arc<InboxStore>,
        message: &dyn Dispatchable,
        context: &DispatchContext,
        handler_key: &str,
    ) -> Option<DispatchResult> {
        // At the edge, the raw wire payload is worth keeping; for in-process
        // messages there are no bytes to record
        let payload = message
            .as_any()
            .downcast_ref::<TransportMessage>()
            .map(|wire| wire.payload().to_vec())
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        if let Some(source) = context.source_transport() {
            metadata.insert("source_transport".to_owned(), source.to_owned());
        }

        match inbox.create_entry(
            context.message_id(),
            handler_key,
            message.type_name(),
            payload,
            metadata,
        ) {
            Ok(()) => None,
            Err(error) if error.kind() == ErrorKind::Duplicate => {
                trace!(
                    message_id = context.message_id(),
                    handler = handler_key,
                    "Suppressed duplicate inbound message",
                );
                MetricRegistry::global()
                    .counter("shunt_inbox_duplicates_total")
                    .inc();

                Some(DispatchResult::success())
            }
            Err(error) => Some(DispatchResult::from_error(error)),
        }
    }

    /// Moves the inbox entry to match the dispatch outcome. Races with
    /// cleanup or disposal are tolerated.
    fn settle_inbox(
        &self,
        inbox: &Arc<InboxStore>,
        context: &DispatchContext,
        handler_key: &str,
        result: &DispatchResult,
    ) {
        let transition = if result.succeeded() {
            inbox.mark_processed(context.message_id(), handler_key)
        } else {
            let reason = result
                .error()
                .map(|error| error.to_string())
                .unwrap_or_else(|| "dispatch failed".to_owned());

            inbox.mark_failed(context.message_id(), handler_key, &reason)
        };

        if let Err(error) = transition {
            debug!(
                message_id = context.message_id(),
                handler = handler_key,
                %error,
                "Inbox transition did not apply",
            );
        }
    }
}

#[async_trait]
impl InboundDispatcher for Dispatcher {
    async fn dispatch(
        &self,
        message: Arc<dyn Dispatchable>,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult {
        let metrics = MetricRegistry::global();
        metrics.counter("shunt_dispatches_total").inc();

        let Some(entry) = self.handlers.resolve(message.as_any().type_id()) else {
            metrics.counter("shunt_dispatches_failed_total").inc();

            return DispatchResult::failure(
                ErrorKind::NotFound,
                format!(
                    "no handler is registered for message type '{}'",
                    message.type_name(),
                ),
            );
        };

        if let Some(inbox) = &self.inbox {
            if let Some(short_circuit) =
                self.admit_to_inbox(inbox, message.as_ref(), context, &entry.handler_key)
            {
                return short_circuit;
            }
        }

        let result = self
            .invoker
            .invoke(message.as_ref(), context, entry.handler.as_ref(), token)
            .await;

        if let Some(inbox) = &self.inbox {
            self.settle_inbox(inbox, context, &entry.handler_key, &result);
        }

        if !result.succeeded() {
            metrics.counter("shunt_dispatches_failed_total").inc();
        }

        result
    }
}

/// Builds a [`Dispatcher`] incrementally.
pub struct DispatcherBuilder {
    middlewares: Vec<MiddlewareRegistration>,
    evaluator: Option<Arc<ApplicabilityEvaluator>>,
    config: InvokerConfig,
    handlers: Option<Arc<HandlerRegistry>>,
    inbox: Option<Arc<InboxStore>>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
            evaluator: None,
            config: InvokerConfig::default(),
            handlers: None,
            inbox: None,
        }
    }

    /// Appends a middleware registration to the pipeline, in execution
    /// order.
    pub fn with_middleware(mut self, registration: MiddlewareRegistration) -> Self {
        self.middlewares.push(registration);

        self
    }

    /// Supplies a shared applicability evaluator. Without one, the
    /// dispatcher owns a fresh evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<ApplicabilityEvaluator>) -> Self {
        self.evaluator = Some(evaluator);

        self
    }

    /// Sets the invoker configuration.
    pub fn with_invoker_config(mut self, config: InvokerConfig) -> Self {
        self.config = config;

        self
    }

    /// Supplies a shared handler registry. Without one, the dispatcher owns
    /// a fresh registry.
    pub fn with_handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = Some(handlers);

        self
    }

    /// Attaches an inbox store for once-only processing.
    pub fn with_inbox(mut self, inbox: Arc<InboxStore>) -> Self {
        self.inbox = Some(inbox);

        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(ApplicabilityEvaluator::new()));

        Dispatcher {
            handlers: self
                .handlers
                .unwrap_or_else(|| Arc::new(HandlerRegistry::new())),
            invoker: PipelineInvoker::new(self.middlewares, evaluator, self.config),
            inbox: self.inbox,
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
