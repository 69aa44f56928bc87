use crate::context::kafka::KafkaContext;
use crate::context::rabbitmq::RabbitMqContext;
use shunt_core::DispatchContext;

/// A context produced by mapping onto a target transport.
///
/// RabbitMQ and Kafka targets yield their specialized contexts; every other
/// target yields a generic context with everything copied across.
#[derive(Debug, Clone)]
pub enum MappedContext {
    /// A RabbitMQ-specialized context.
    RabbitMq(RabbitMqContext),
    /// A Kafka-specialized context.
    Kafka(KafkaContext),
    /// A generic context for every other target.
    Generic(DispatchContext),
}

impl MappedContext {
    /// Borrows the underlying plain context, whatever the variant.
    pub fn context(&self) -> &DispatchContext {
        match self {
            MappedContext::RabbitMq(context) => context,
            MappedContext::Kafka(context) => context,
            MappedContext::Generic(context) => context,
        }
    }

    /// Unwraps into the underlying plain context, whatever the variant.
    pub fn into_context(self) -> DispatchContext {
        match self {
            MappedContext::RabbitMq(context) => context.into_inner(),
            MappedContext::Kafka(context) => context.into_inner(),
            MappedContext::Generic(context) => context,
        }
    }
}

/// Translates a transport-neutral message context into a transport-specific
/// one.
///
/// The base contract: copy identity, correlation, causation, timestamp,
/// content type, source transport, headers, and the transport-property bag;
/// set the target transport; return the concrete context variant appropriate
/// for the target. [`clone_for_target`] implements exactly that copy and is
/// what mapper implementations build on.
pub trait ContextMapper: Send + Sync {
    /// Maps the given source context onto the named target transport.
    fn map(&self, source: &DispatchContext, target_transport: &str) -> MappedContext;
}

/// Copies everything the base mapping contract requires and stamps the
/// target transport.
pub fn clone_for_target(source: &DispatchContext, target_transport: &str) -> DispatchContext {
    let mut target = source.clone();
    target.set_target_transport(target_transport);

    target
}

/// Wraps a plain context in the concrete variant appropriate for the named
/// target transport. Unknown targets yield the generic variant — never an
/// error.
pub fn specialize(context: DispatchContext, target_transport: &str) -> MappedContext {
    if target_transport.eq_ignore_ascii_case("rabbitmq") {
        MappedContext::RabbitMq(RabbitMqContext::new(context))
    } else if target_transport.eq_ignore_ascii_case("kafka") {
        MappedContext::Kafka(KafkaContext::new(context))
    } else {
        MappedContext::Generic(context)
    }
}

/// The wildcard mapper: the base copy, specialized by target name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMapper;

impl ContextMapper for DefaultMapper {
    fn map(&self, source: &DispatchContext, target_transport: &str) -> MappedContext {
        specialize(clone_for_target(source, target_transport), target_transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shunt_core::headers;

    fn make_source() -> DispatchContext {
        let mut source = DispatchContext::with_message_id("m-1");
        source.set_correlation_id("corr-1");
        source.set_causation_id("m-0");
        source.set_source_transport("rabbit");
        source.set_content_type("application/json");
        source
            .headers_mut()
            .set(headers::TENANT_ID, Some("acme"))
            .unwrap();
        source.set_transport_property("rabbitmq.routing_key", "orders.created");

        source
    }

    #[test]
    fn the_base_copy_carries_everything_and_stamps_the_target() {
        // Given
        let source = make_source();

        // When
        let mapped = DefaultMapper.map(&source, "grpc");
        let target = mapped.context();

        // Then
        assert_eq!(target.message_id(), "m-1");
        assert_eq!(target.correlation_id(), Some("corr-1"));
        assert_eq!(target.causation_id(), Some("m-0"));
        assert_eq!(target.source_transport(), Some("rabbit"));
        assert_eq!(target.target_transport(), Some("grpc"));
        assert_eq!(target.content_type(), Some("application/json"));
        assert_eq!(target.timestamp(), source.timestamp());
        assert_eq!(target.headers().get(headers::TENANT_ID), Some("acme"));
        assert_eq!(
            target.transport_property::<String>("rabbitmq.routing_key"),
            Some("orders.created".to_owned()),
        );
    }

    #[test]
    fn known_targets_yield_their_concrete_variants() {
        // Given
        let source = make_source();

        // Then
        assert!(matches!(
            DefaultMapper.map(&source, "RabbitMQ"),
            MappedContext::RabbitMq(_),
        ));
        assert!(matches!(
            DefaultMapper.map(&source, "kafka"),
            MappedContext::Kafka(_),
        ));
        assert!(matches!(
            DefaultMapper.map(&source, "azure-service-bus"),
            MappedContext::Generic(_),
        ));
    }

    #[test]
    fn an_unknown_target_maps_without_an_error() {
        // Given
        let source = make_source();

        // When
        let mapped = DefaultMapper.map(&source, "carrier-pigeon");

        // Then
        assert!(matches!(mapped, MappedContext::Generic(_)));
        assert_eq!(
            mapped.context().target_transport(),
            Some("carrier-pigeon"),
        );
    }
}
