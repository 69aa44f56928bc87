use crate::middleware::Middleware;
use dashmap::DashMap;
use shunt_core::{DispatchError, MessageKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::warn;

/// The set of feature flags enabled for a dispatch surface.
///
/// Feature names compare exactly (they are configuration identifiers, not
/// wire headers). The ordered set representation makes a snapshot of the set
/// usable directly as a cache key.
pub type FeatureSet = BTreeSet<String>;

/// The signature of a custom applicability predicate.
type Predicate = dyn Fn(MessageKind, &FeatureSet) -> Result<bool, DispatchError> + Send + Sync;

/// Declarative applicability constraints attached to a middleware at
/// registration.
///
/// Constraints take precedence over the mask the middleware itself declares
/// via [`Middleware::applicable_kinds`]. Three declarative axes exist —
/// an applies-to mask, an exclusion mask (exclusion always wins), and a set
/// of required feature flags — plus an optional custom predicate for
/// conditions the declarative axes cannot express. The predicate is the one
/// part of evaluation that can fail; what happens to a failing middleware is
/// the invoker's include-on-filter-error policy.
#[derive(Clone, Default)]
pub struct Applicability {
    applies_to: Option<MessageKind>,
    exclude_kinds: MessageKind,
    required_features: FeatureSet,
    predicate: Option<Arc<Predicate>>,
}

impl Applicability {
    /// Creates an empty set of constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrains the middleware to the given kinds.
    pub fn applies_to(mut self, kinds: MessageKind) -> Self {
        self.applies_to = Some(kinds);

        self
    }

    /// Excludes the given kinds. Exclusion overrides inclusion.
    pub fn excluding(mut self, kinds: MessageKind) -> Self {
        self.exclude_kinds = self.exclude_kinds | kinds;

        self
    }

    /// Requires the given feature flag to be enabled.
    pub fn requires_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.insert(feature.into());

        self
    }

    /// Attaches a custom predicate, evaluated after the declarative axes.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(MessageKind, &FeatureSet) -> Result<bool, DispatchError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));

        self
    }
}

impl std::fmt::Debug for Applicability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applicability")
            .field("applies_to", &self.applies_to)
            .field("exclude_kinds", &self.exclude_kinds)
            .field("required_features", &self.required_features)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// One middleware as registered with a pipeline: the instance, its type
/// name, and the constraints supplied at registration.
///
/// Every registration carries a process-unique ID, which is what the
/// applicability cache keys decisions by.
#[derive(Clone)]
pub struct MiddlewareRegistration {
    id: usize,
    type_name: &'static str,
    instance: Arc<dyn Middleware>,
    constraints: Option<Applicability>,
}

impl MiddlewareRegistration {
    /// Registers the given middleware instance without constraints.
    pub fn new<M: Middleware>(instance: M) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            type_name: std::any::type_name::<M>(),
            instance: Arc::new(instance),
            constraints: None,
        }
    }

    /// Attaches applicability constraints to this registration.
    pub fn with_constraints(mut self, constraints: Applicability) -> Self {
        self.constraints = Some(constraints);

        self
    }

    /// Reports the process-unique ID of this registration.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Reports the type name of the registered middleware.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Exposes the registered middleware instance.
    pub fn instance(&self) -> &Arc<dyn Middleware> {
        &self.instance
    }

    /// Exposes the constraints supplied at registration, if any.
    pub fn constraints(&self) -> Option<&Applicability> {
        self.constraints.as_ref()
    }
}

impl std::fmt::Debug for MiddlewareRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistration")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("constraints", &self.constraints)
            .finish()
    }
}

/// Decides whether a middleware participates in the chain for a given
/// message kind and enabled feature set, memoizing decisions.
///
/// ## Decision rule
///
/// A middleware applies iff the message kind intersects its effective
/// applies-to mask (registration constraints win over the instance-declared
/// mask; the default is every kind), the kind does not intersect its
/// exclusion mask, every required feature is enabled, and the custom
/// predicate (if any) agrees.
///
/// ## Cache phases
///
/// The memo table has two phases. In the **mutable** phase decisions are
/// cached as they are computed. After [`freeze_cache`](Self::freeze_cache)
/// the table is **frozen**: misses still compute correct decisions but are
/// no longer stored. [`clear_cache`](Self::clear_cache) empties the table
/// and returns to the mutable phase. Decisions themselves are pure functions
/// of the registration, kind, and feature set, so the phase never changes an
/// answer — only whether it was remembered.
pub struct ApplicabilityEvaluator {
    cache: DashMap<(usize, MessageKind, FeatureSet), bool>,
    frozen: AtomicBool,
}

impl ApplicabilityEvaluator {
    /// Creates an evaluator with an empty, mutable cache.
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Reports whether the given middleware applies to the given kind, with
    /// no features enabled.
    pub fn is_applicable(
        &self,
        registration: &MiddlewareRegistration,
        kind: MessageKind,
    ) -> Result<bool, DispatchError> {
        static NO_FEATURES: FeatureSet = FeatureSet::new();

        self.is_applicable_with(registration, kind, &NO_FEATURES)
    }

    /// Reports whether the given middleware applies to the given kind under
    /// the given enabled features.
    pub fn is_applicable_with(
        &self,
        registration: &MiddlewareRegistration,
        kind: MessageKind,
        features: &FeatureSet,
    ) -> Result<bool, DispatchError> {
        let key = (registration.id(), kind, features.clone());

        if let Some(hit) = self.cache.get(&key) {
            return Ok(*hit);
        }

        let decision = Self::evaluate(registration, kind, features)?;

        if !self.is_cache_frozen() {
            self.cache.insert(key, decision);
        }

        Ok(decision)
    }

    /// Reports whether the given middleware applies, bypassing the memo
    /// table entirely. Used when decision caching is disabled by
    /// configuration.
    pub fn is_applicable_uncached(
        &self,
        registration: &MiddlewareRegistration,
        kind: MessageKind,
        features: &FeatureSet,
    ) -> Result<bool, DispatchError> {
        Self::evaluate(registration, kind, features)
    }

    /// Yields the subset of the given registrations that applies to the
    /// given kind and features, preserving input order.
    ///
    /// A registration whose predicate fails is included or dropped according
    /// to `include_on_error`.
    pub fn filter_applicable<'r>(
        &self,
        registrations: &'r [MiddlewareRegistration],
        kind: MessageKind,
        features: &FeatureSet,
        include_on_error: bool,
    ) -> Vec<&'r MiddlewareRegistration> {
        registrations
            .iter()
            .filter(|registration| {
                match self.is_applicable_with(registration, kind, features) {
                    Ok(decision) => decision,
                    Err(error) => {
                        warn!(
                            middleware = registration.type_name(),
                            %error,
                            included = include_on_error,
                            "Applicability predicate failed during filtering",
                        );

                        include_on_error
                    }
                }
            })
            .collect()
    }

    /// Locks the memo table. Idempotent; misses keep computing correctly.
    pub fn freeze_cache(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Empties the memo table and returns it to the mutable phase.
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.frozen.store(false, Ordering::Release);
    }

    /// Reports whether the memo table is frozen.
    pub fn is_cache_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Computes one decision from first principles.
    fn evaluate(
        registration: &MiddlewareRegistration,
        kind: MessageKind,
        features: &FeatureSet,
    ) -> Result<bool, DispatchError> {
        let constraints = registration.constraints();

        // Registration constraints win over the instance-declared mask
        let applies_to = constraints
            .and_then(|c| c.applies_to)
            .unwrap_or_else(|| registration.instance().applicable_kinds());

        if !kind.intersects(applies_to) {
            return Ok(false);
        }

        let Some(constraints) = constraints else {
            return Ok(true);
        };

        // Exclusion overrides inclusion
        if kind.intersects(constraints.exclude_kinds) {
            return Ok(false);
        }

        if !constraints
            .required_features
            .iter()
            .all(|feature| features.contains(feature))
        {
            return Ok(false);
        }

        match &constraints.predicate {
            Some(predicate) => predicate(kind, features),
            None => Ok(true),
        }
    }
}

impl Default for ApplicabilityEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
