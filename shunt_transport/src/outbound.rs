use crate::binding::BindingMatcher;
use crate::mapping::layout::MappingLayout;
use crate::mapping::registry::MapperRegistry;
use crate::message::TransportMessage;
use shunt_core::{DispatchContext, DispatchResult, Dispatchable, ErrorKind, headers};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Routes outbound messages to a transport by endpoint pattern, translating
/// the dispatch context for the chosen target on the way out.
///
/// One send walks the bindings in descending priority for the first one
/// whose endpoint pattern matches and whose accepted kinds intersect the
/// message's kind, maps the context through the `(source, target)` mapper,
/// applies the typed mapping layout for the target's substrate, folds the
/// resulting transport properties and carrier headers onto the wire message,
/// and hands it to the bound adapter.
pub struct OutboundRouter {
    matcher: BindingMatcher,
    mappers: Arc<MapperRegistry>,
    layout: MappingLayout,
}

impl OutboundRouter {
    /// Creates a router over the given bindings, with the wildcard mapper
    /// registry and an empty mapping layout.
    pub fn new(matcher: BindingMatcher) -> Self {
        Self {
            matcher,
            mappers: Arc::new(MapperRegistry::new()),
            layout: MappingLayout::default(),
        }
    }

    /// Supplies a shared mapper registry.
    pub fn with_mappers(mut self, mappers: Arc<MapperRegistry>) -> Self {
        self.mappers = mappers;

        self
    }

    /// Supplies the typed mapping layout.
    pub fn with_layout(mut self, layout: MappingLayout) -> Self {
        self.layout = layout;

        self
    }

    /// Exposes the binding matcher.
    pub fn matcher(&self) -> &BindingMatcher {
        &self.matcher
    }

    /// Sends the given message to the given endpoint through the first
    /// matching binding.
    ///
    /// Fails with [`NotFound`](ErrorKind::NotFound) when no binding accepts
    /// the endpoint and kind.
    pub async fn send(
        &self,
        mut message: TransportMessage,
        context: &DispatchContext,
        endpoint: &str,
        token: &CancellationToken,
    ) -> DispatchResult {
        let kind = message.kind();

        let Some(binding) = self.matcher.match_binding(endpoint, kind) else {
            return DispatchResult::failure(
                ErrorKind::NotFound,
                format!(
                    "no binding accepts endpoint '{}' for kind '{}'",
                    endpoint, kind,
                ),
            );
        };

        let adapter = binding.adapter();
        let source = context.source_transport().unwrap_or("local");

        // Translate the context for the target, then apply the typed layout
        let mapper = self.mappers.get_mapper(source, adapter.name());
        let mut mapped = mapper.map(context, adapter.name()).into_context();
        self.layout.apply(&mut mapped, adapter.transport_type());

        // Everything the mapping produced becomes part of the wire message:
        // the property bag carries the send options, the headers carry the
        // cross-transport fields
        message
            .properties_mut()
            .merge_from(mapped.transport_properties());
        for (name, value) in mapped.headers().iter() {
            // The header name came off a live header map, never empty
            let _ = message.headers_mut().set(name, value);
        }
        if let Some(correlation_id) = mapped.correlation_id() {
            let _ = message
                .headers_mut()
                .set(headers::CORRELATION_ID, Some(correlation_id));
        }
        if let Some(causation_id) = mapped.causation_id() {
            let _ = message
                .headers_mut()
                .set(headers::CAUSATION_ID, Some(causation_id));
        }

        trace!(
            endpoint,
            binding = binding.name(),
            transport = adapter.name(),
            "Routing outbound message",
        );

        adapter.send(message, endpoint, token).await
    }
}
