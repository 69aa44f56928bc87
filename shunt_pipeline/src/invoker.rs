use crate::applicability::{ApplicabilityEvaluator, FeatureSet, MiddlewareRegistration};
use crate::chain::ChainBuilder;
use crate::middleware::{FinalHandler, Middleware, MiddlewareStage, Next};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use shunt_core::{DispatchContext, DispatchResult, Dispatchable, ErrorKind, MessageKind, TypedResult};
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Configuration of a pipeline invoker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct InvokerConfig {
    /// Whether applicability decisions are memoized. Disabling this makes
    /// the filtered invoker re-evaluate applicability on every dispatch.
    pub cache_decisions: bool,
    /// Whether a middleware whose applicability evaluation fails stays in
    /// the executed chain (`true`) or is dropped (`false`).
    pub include_middleware_on_filter_error: bool,
    /// The feature flags enabled on this dispatch surface.
    pub features: FeatureSet,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            cache_decisions: true,
            include_middleware_on_filter_error: false,
            features: FeatureSet::new(),
        }
    }
}

/// The public entry point for driving a message through a compiled chain to
/// a final handler.
///
/// The invoker owns the [`ChainBuilder`]: each dispatch detects the
/// message's kind exactly once, looks up (or compiles) the chain for the
/// message's concrete type, and executes it. Nullability of arguments is
/// enforced by construction in this API; what remains to validate at entry
/// is cancellation, which fails fast with
/// [`Cancelled`](shunt_core::ErrorKind::Cancelled).
pub struct PipelineInvoker {
    builder: ChainBuilder,
}

impl PipelineInvoker {
    /// Creates an invoker over the given ordered middleware registrations.
    pub fn new(
        registrations: Vec<MiddlewareRegistration>,
        evaluator: Arc<ApplicabilityEvaluator>,
        config: InvokerConfig,
    ) -> Self {
        let builder = ChainBuilder::new(registrations, evaluator)
            .with_features(config.features)
            .include_middleware_on_filter_error(config.include_middleware_on_filter_error);

        Self { builder }
    }

    /// Exposes the underlying chain builder.
    pub fn chain_builder(&self) -> &ChainBuilder {
        &self.builder
    }

    /// Pre-computes chains for the given known message types and locks the
    /// chain cache.
    pub fn freeze(&self, known_types: impl IntoIterator<Item = (TypeId, MessageKind)>) {
        self.builder.freeze(known_types);
    }

    /// Drives the given message through its chain to the given final
    /// handler.
    pub async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        terminal: &dyn FinalHandler,
        token: &CancellationToken,
    ) -> DispatchResult {
        if token.is_cancelled() {
            return DispatchResult::failure(
                ErrorKind::Cancelled,
                "dispatch cancelled before the chain started",
            );
        }

        // Kind detection happens exactly once per dispatch
        let kind = message.kind();
        let chain = self.builder.chain_for(message.as_any().type_id(), kind);

        chain.invoke(message, context, terminal, token).await
    }

    /// Drives the given message through its chain and asserts the payload
    /// type of the terminal result.
    ///
    /// An absent payload is legal; a payload of a different runtime type
    /// fails with [`TypeMismatch`](shunt_core::ErrorKind::TypeMismatch).
    pub async fn invoke_typed<R: Any + Send>(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        terminal: &dyn FinalHandler,
        token: &CancellationToken,
    ) -> TypedResult<R> {
        self.invoke(message, context, terminal, token)
            .await
            .into_typed::<R>()
    }
}

/// A middleware that hosts a nested, per-dispatch-filtered middleware list.
///
/// Where the [`PipelineInvoker`] compiles one chain per message type up
/// front, the filtered invoker re-selects its nested middlewares on every
/// dispatch — against the live feature set and, when decision caching is
/// disabled, bypassing the applicability memo table entirely. It
/// participates in outer chains as an ordinary middleware at the
/// [`Processing`](MiddlewareStage::Processing) stage, applicable to every
/// kind; its own continuation serves as the terminal of the nested run.
pub struct FilteredInvoker {
    registrations: Vec<MiddlewareRegistration>,
    evaluator: Arc<ApplicabilityEvaluator>,
    config: InvokerConfig,
}

impl FilteredInvoker {
    /// Creates a filtered invoker over the given nested registrations.
    pub fn new(
        registrations: Vec<MiddlewareRegistration>,
        evaluator: Arc<ApplicabilityEvaluator>,
        config: InvokerConfig,
    ) -> Self {
        Self {
            registrations,
            evaluator,
            config,
        }
    }

    /// Selects the nested middlewares applicable to the given kind.
    fn select(&self, kind: MessageKind) -> Vec<Arc<dyn Middleware>> {
        let mut selected = Vec::new();

        for registration in &self.registrations {
            let decision = if self.config.cache_decisions {
                self.evaluator
                    .is_applicable_with(registration, kind, &self.config.features)
            } else {
                self.evaluator
                    .is_applicable_uncached(registration, kind, &self.config.features)
            };

            match decision {
                Ok(true) => selected.push(Arc::clone(registration.instance())),
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        middleware = registration.type_name(),
                        %error,
                        included = self.config.include_middleware_on_filter_error,
                        "Applicability evaluation failed during dispatch",
                    );

                    if self.config.include_middleware_on_filter_error {
                        selected.push(Arc::clone(registration.instance()));
                    }
                }
            }
        }

        selected
    }
}

#[async_trait]
impl Middleware for FilteredInvoker {
    fn stage(&self) -> MiddlewareStage {
        MiddlewareStage::Processing
    }

    fn applicable_kinds(&self) -> MessageKind {
        MessageKind::ALL
    }

    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult {
        if token.is_cancelled() {
            return DispatchResult::failure(
                ErrorKind::Cancelled,
                "dispatch cancelled before the nested chain started",
            );
        }

        let selected = self.select(message.kind());

        // The outer continuation is the terminal of the nested run
        let terminal = ContinuationTerminal {
            next: Mutex::new(Some(next)),
        };

        Next::entry(&selected, &terminal)
            .run(message, context, token)
            .await
    }
}

/// Adapts an outer [`Next`] continuation into the [`FinalHandler`] seat of a
/// nested chain.
struct ContinuationTerminal<'a> {
    next: Mutex<Option<Next<'a>>>,
}

#[async_trait]
impl FinalHandler for ContinuationTerminal<'_> {
    async fn handle(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult {
        let continuation = self.next.lock().take();

        match continuation {
            Some(next) => next.run(message, context, token).await,
            None => DispatchResult::failure(
                ErrorKind::InvalidTransition,
                "the outer continuation has already been consumed",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::Applicability;
    use pretty_assertions::assert_eq;

    struct PlaceOrderCommand;
    impl Dispatchable for PlaceOrderCommand {}

    struct OrderPlacedEvent;
    impl Dispatchable for OrderPlacedEvent {}

    /// A final handler that answers with a fixed numeric payload.
    struct NumberHandler;

    #[async_trait]
    impl FinalHandler for NumberHandler {
        async fn handle(
            &self,
            _message: &dyn Dispatchable,
            _context: &mut DispatchContext,
            _token: &CancellationToken,
        ) -> DispatchResult {
            DispatchResult::success_with(42u64)
        }
    }

    /// A middleware that marks the context as it passes through.
    struct Marker(&'static str);

    #[async_trait]
    impl Middleware for Marker {
        async fn invoke(
            &self,
            message: &dyn Dispatchable,
            context: &mut DispatchContext,
            next: Next<'_>,
            token: &CancellationToken,
        ) -> DispatchResult {
            context.properties_mut().set(self.0, true);

            next.run(message, context, token).await
        }
    }

    fn make_invoker(registrations: Vec<MiddlewareRegistration>) -> PipelineInvoker {
        PipelineInvoker::new(
            registrations,
            Arc::new(ApplicabilityEvaluator::new()),
            InvokerConfig::default(),
        )
    }

    #[tokio::test]
    async fn pre_cancelled_token_fails_before_the_chain() {
        // Given
        let invoker = make_invoker(vec![MiddlewareRegistration::new(Marker("touched"))]);
        let mut context = DispatchContext::with_message_id("m1");
        let token = CancellationToken::new();
        token.cancel();

        // When
        let result = invoker
            .invoke(&PlaceOrderCommand, &mut context, &NumberHandler, &token)
            .await;

        // Then: failed as cancelled, and no middleware ran
        assert!(!result.succeeded());
        assert_eq!(result.error().unwrap().kind(), ErrorKind::Cancelled);
        assert_eq!(context.properties().get::<bool>("touched"), None);
    }

    #[tokio::test]
    async fn typed_invoke_returns_the_matching_payload() {
        // Given
        let invoker = make_invoker(Vec::new());
        let mut context = DispatchContext::with_message_id("m2");

        // When
        let typed = invoker
            .invoke_typed::<u64>(
                &PlaceOrderCommand,
                &mut context,
                &NumberHandler,
                &CancellationToken::new(),
            )
            .await;

        // Then
        assert!(typed.succeeded());
        assert_eq!(typed.into_payload(), Some(42));
    }

    #[tokio::test]
    async fn typed_invoke_flags_a_payload_of_the_wrong_type() {
        // Given
        let invoker = make_invoker(Vec::new());
        let mut context = DispatchContext::with_message_id("m3");

        // When
        let typed = invoker
            .invoke_typed::<String>(
                &PlaceOrderCommand,
                &mut context,
                &NumberHandler,
                &CancellationToken::new(),
            )
            .await;

        // Then
        assert!(!typed.succeeded());
        assert_eq!(typed.error().unwrap().kind(), ErrorKind::TypeMismatch);
    }

    #[tokio::test]
    async fn filtered_invoker_selects_per_dispatch_and_falls_through() {
        // Given: a nested list with one action-only middleware
        let evaluator = Arc::new(ApplicabilityEvaluator::new());
        let filtered = FilteredInvoker::new(
            vec![
                MiddlewareRegistration::new(Marker("action-only"))
                    .with_constraints(Applicability::new().applies_to(MessageKind::ACTION)),
                MiddlewareRegistration::new(Marker("always")),
            ],
            Arc::clone(&evaluator),
            InvokerConfig::default(),
        );
        let invoker = make_invoker(vec![MiddlewareRegistration::new(filtered)]);

        // When: dispatch an event
        let mut context = DispatchContext::with_message_id("m4");
        let result = invoker
            .invoke(
                &OrderPlacedEvent,
                &mut context,
                &NumberHandler,
                &CancellationToken::new(),
            )
            .await;

        // Then: only the unconstrained middleware ran, and the handler was
        // still reached through the outer continuation
        assert!(result.succeeded());
        assert_eq!(context.properties().get::<bool>("action-only"), None);
        assert_eq!(context.properties().get::<bool>("always"), Some(true));
    }

    #[tokio::test]
    async fn filtered_invoker_honours_the_stage_contract() {
        // Given
        let filtered = FilteredInvoker::new(
            Vec::new(),
            Arc::new(ApplicabilityEvaluator::new()),
            InvokerConfig::default(),
        );

        // Then
        assert_eq!(filtered.stage(), MiddlewareStage::Processing);
        assert_eq!(filtered.applicable_kinds(), MessageKind::ALL);
    }
}
