use crate::applicability::{ApplicabilityEvaluator, FeatureSet, MiddlewareRegistration};
use crate::middleware::{FinalHandler, Middleware, Next};
use dashmap::DashMap;
use shunt_core::{DispatchContext, DispatchResult, Dispatchable, MessageKind};
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An immutable, compiled middleware chain for one message type.
///
/// The chain owns its middleware array; execution threads a
/// [`ChainCursor`](crate::ChainCursor) through that array rather than
/// composing closures, so the steady-state dispatch path allocates nothing
/// per middleware.
#[derive(Clone)]
pub struct Chain {
    middlewares: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
    /// Compiles a chain from the given ordered middleware list.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: middlewares.into(),
        }
    }

    /// Reports the number of middlewares in this chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Reports whether this chain has no middlewares.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Executes the chain: each middleware in configured order, then the
    /// final handler.
    ///
    /// An empty chain invokes the final handler directly. A middleware that
    /// returns without awaiting its continuation short-circuits everything
    /// after it. A middleware that panics propagates the panic unchanged —
    /// the executor adds no retry, no logging wrapper, and no result
    /// substitution.
    ///
    /// A middleware may invoke a *different* chain from within its own
    /// dispatch; the outer chain's cursor state is unaffected by such
    /// reentry.
    pub async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        terminal: &dyn FinalHandler,
        token: &CancellationToken,
    ) -> DispatchResult {
        if self.middlewares.is_empty() {
            return terminal.handle(message, context, token).await;
        }

        Next::entry(&self.middlewares, terminal)
            .run(message, context, token)
            .await
    }
}

/// Compiles and interns one [`Chain`] per concrete message type.
///
/// On a cache miss the configured middleware list is filtered through the
/// [`ApplicabilityEvaluator`] against the message's kind and the builder's
/// enabled features, and the surviving ordered list is closed into a chain.
/// Interning guarantees that concurrent callers observe exactly one chain
/// instance per type.
///
/// A builder can be [frozen](ChainBuilder::freeze): chains for the supplied
/// known types are pre-computed, and from then on the intern map is no
/// longer mutated — unknown types are served by uncached builds.
pub struct ChainBuilder {
    registrations: Vec<MiddlewareRegistration>,
    evaluator: Arc<ApplicabilityEvaluator>,
    features: FeatureSet,
    include_on_filter_error: bool,
    chains: DashMap<TypeId, Arc<Chain>>,
    frozen: AtomicBool,
}

impl ChainBuilder {
    /// Creates a builder over the given ordered middleware registrations.
    pub fn new(
        registrations: Vec<MiddlewareRegistration>,
        evaluator: Arc<ApplicabilityEvaluator>,
    ) -> Self {
        Self {
            registrations,
            evaluator,
            features: FeatureSet::new(),
            include_on_filter_error: false,
            chains: DashMap::new(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Sets the feature flags chains are compiled against.
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;

        self
    }

    /// Sets whether a middleware whose applicability predicate fails stays
    /// in the compiled chain. Defaults to false (dropped).
    pub fn include_middleware_on_filter_error(mut self, include: bool) -> Self {
        self.include_on_filter_error = include;

        self
    }

    /// Returns the chain for the given message type, compiling and interning
    /// it on first demand.
    pub fn chain_for(&self, message_type: TypeId, kind: MessageKind) -> Arc<Chain> {
        if self.is_frozen() {
            // Frozen: serve interned chains, build (but do not intern) new ones
            return match self.chains.get(&message_type) {
                Some(chain) => Arc::clone(&chain),
                None => Arc::new(self.build(kind)),
            };
        }

        Arc::clone(
            &self
                .chains
                .entry(message_type)
                .or_insert_with(|| Arc::new(self.build(kind))),
        )
    }

    /// Pre-computes chains for the given known message types, then locks the
    /// intern map. Idempotent.
    pub fn freeze(&self, known_types: impl IntoIterator<Item = (TypeId, MessageKind)>) {
        for (message_type, kind) in known_types {
            self.chains
                .entry(message_type)
                .or_insert_with(|| Arc::new(self.build(kind)));
        }

        self.frozen.store(true, Ordering::Release);

        debug!(chains = self.chains.len(), "Chain intern map frozen");
    }

    /// Reports whether the intern map is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Reports the number of interned chains.
    pub fn interned_count(&self) -> usize {
        self.chains.len()
    }

    /// Compiles a chain for the given kind by filtering the registrations.
    fn build(&self, kind: MessageKind) -> Chain {
        let selected = self
            .evaluator
            .filter_applicable(
                &self.registrations,
                kind,
                &self.features,
                self.include_on_filter_error,
            )
            .into_iter()
            .map(|registration| Arc::clone(registration.instance()))
            .collect::<Vec<_>>();

        debug!(
            kind = %kind,
            selected = selected.len(),
            configured = self.registrations.len(),
            "Compiled middleware chain",
        );

        Chain::new(selected)
    }
}
