use crate::adapter::TransportAdapter;
use shunt_core::MessageKind;
use std::sync::Arc;

/// Reports whether the given endpoint matches the given pattern.
///
/// Patterns support two wildcards: `*` matches one or more of any
/// characters, and `?` matches exactly one. Everything else matches
/// literally, ignoring ASCII case.
///
/// ## Example
///
/// ```
/// use shunt_transport::endpoint_pattern_matches;
///
/// assert!(endpoint_pattern_matches("orders/*", "orders/create"));
/// assert!(!endpoint_pattern_matches("orders/*", "payments/create"));
/// assert!(endpoint_pattern_matches("orders/?", "orders/1"));
/// assert!(!endpoint_pattern_matches("orders/?", "orders/12"));
/// ```
pub fn endpoint_pattern_matches(pattern: &str, endpoint: &str) -> bool {
    // Normalize casing once, then match bytewise
    let pattern = pattern.to_ascii_lowercase();
    let endpoint = endpoint.to_ascii_lowercase();

    glob_match(pattern.as_bytes(), endpoint.as_bytes())
}

fn glob_match(pattern: &[u8], input: &[u8]) -> bool {
    match pattern.split_first() {
        None => input.is_empty(),
        Some((b'?', rest)) => !input.is_empty() && glob_match(rest, &input[1..]),
        // One or more characters: try every non-empty prefix
        Some((b'*', rest)) => (1..=input.len()).any(|eaten| glob_match(rest, &input[eaten..])),
        Some((literal, rest)) => {
            input.first() == Some(literal) && glob_match(rest, &input[1..])
        }
    }
}

/// A route from the dispatch surface to a transport: an endpoint pattern, a
/// kind filter, and a priority.
///
/// Bindings reference adapters but do not own them; ownership stays with the
/// [`TransportRegistry`](crate::TransportRegistry).
#[derive(Clone)]
pub struct TransportBinding {
    name: String,
    adapter: Arc<dyn TransportAdapter>,
    endpoint_pattern: String,
    profile: Option<String>,
    accepted_kinds: MessageKind,
    priority: i32,
}

impl TransportBinding {
    /// Creates a binding with the given name, adapter, and endpoint
    /// pattern, accepting every kind at priority zero.
    pub fn new(
        name: impl Into<String>,
        adapter: Arc<dyn TransportAdapter>,
        endpoint_pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            endpoint_pattern: endpoint_pattern.into(),
            profile: None,
            accepted_kinds: MessageKind::ALL,
            priority: 0,
        }
    }

    /// Associates a pipeline profile name with this binding.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());

        self
    }

    /// Restricts this binding to the given message kinds.
    pub fn with_accepted_kinds(mut self, kinds: MessageKind) -> Self {
        self.accepted_kinds = kinds;

        self
    }

    /// Sets the priority of this binding. Higher priorities are consulted
    /// first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;

        self
    }

    /// Reports the binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposes the bound adapter.
    pub fn adapter(&self) -> &Arc<dyn TransportAdapter> {
        &self.adapter
    }

    /// Reports the endpoint pattern.
    pub fn endpoint_pattern(&self) -> &str {
        &self.endpoint_pattern
    }

    /// Reports the associated pipeline profile name, if any.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Reports the accepted message kinds.
    pub fn accepted_kinds(&self) -> MessageKind {
        self.accepted_kinds
    }

    /// Reports the priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Reports whether this binding accepts the given endpoint and kind.
    pub fn matches(&self, endpoint: &str, kind: MessageKind) -> bool {
        self.accepted_kinds.intersects(kind)
            && endpoint_pattern_matches(&self.endpoint_pattern, endpoint)
    }
}

impl std::fmt::Debug for TransportBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportBinding")
            .field("name", &self.name)
            .field("endpoint_pattern", &self.endpoint_pattern)
            .field("accepted_kinds", &self.accepted_kinds)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Matches outbound messages to bindings, highest priority first.
pub struct BindingMatcher {
    bindings: Vec<TransportBinding>,
}

impl BindingMatcher {
    /// Creates a matcher over the given bindings. Bindings are consulted in
    /// descending priority order; equal priorities keep their insertion
    /// order.
    pub fn new(mut bindings: Vec<TransportBinding>) -> Self {
        bindings.sort_by_key(|binding| std::cmp::Reverse(binding.priority()));

        Self { bindings }
    }

    /// Returns the first binding that accepts the given endpoint and
    /// message kind.
    pub fn match_binding(&self, endpoint: &str, kind: MessageKind) -> Option<&TransportBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(endpoint, kind))
    }

    /// Exposes the bindings in consultation order.
    pub fn bindings(&self) -> &[TransportBinding] {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTransport;
    use pretty_assertions::assert_eq;

    fn make_binding(name: &str, pattern: &str) -> TransportBinding {
        TransportBinding::new(name, Arc::new(InMemoryTransport::new(name)), pattern)
    }

    #[test]
    fn star_matches_one_or_more_characters() {
        assert!(endpoint_pattern_matches("orders/*", "orders/create"));
        assert!(endpoint_pattern_matches("orders/*", "orders/c"));
        assert!(!endpoint_pattern_matches("orders/*", "orders/"));
        assert!(!endpoint_pattern_matches("orders/*", "payments/create"));
        assert!(endpoint_pattern_matches("*/create", "orders/create"));
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        assert!(endpoint_pattern_matches("orders/?", "orders/1"));
        assert!(!endpoint_pattern_matches("orders/?", "orders/12"));
        assert!(!endpoint_pattern_matches("orders/?", "orders/"));
    }

    #[test]
    fn literal_matching_ignores_case() {
        assert!(endpoint_pattern_matches("Orders/Create", "orders/create"));
        assert!(endpoint_pattern_matches("orders/*", "ORDERS/CREATE"));
    }

    #[test]
    fn highest_priority_binding_wins() {
        // Given
        let matcher = BindingMatcher::new(vec![
            make_binding("catch-all", "*").with_priority(0),
            make_binding("orders", "orders/*").with_priority(10),
        ]);

        // When
        let matched = matcher
            .match_binding("orders/create", MessageKind::ACTION)
            .unwrap();

        // Then
        assert_eq!(matched.name(), "orders");
    }

    #[test]
    fn kind_filter_excludes_non_intersecting_bindings() {
        // Given
        let matcher = BindingMatcher::new(vec![
            make_binding("events-only", "orders/*")
                .with_accepted_kinds(MessageKind::EVENT)
                .with_priority(10),
            make_binding("catch-all", "*").with_priority(0),
        ]);

        // When: an action does not intersect the events-only binding
        let matched = matcher
            .match_binding("orders/create", MessageKind::ACTION)
            .unwrap();

        // Then
        assert_eq!(matched.name(), "catch-all");
    }

    #[test]
    fn no_binding_matches_a_foreign_endpoint() {
        // Given
        let matcher = BindingMatcher::new(vec![make_binding("orders", "orders/*")]);

        // Then
        assert!(
            matcher
                .match_binding("payments/create", MessageKind::ACTION)
                .is_none()
        );
    }
}
