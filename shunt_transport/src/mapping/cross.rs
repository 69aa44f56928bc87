use crate::context::kafka::{KafkaContext, keys as kafka_keys};
use crate::context::rabbitmq::{
    DELIVERY_MODE_PERSISTENT, RabbitMqContext, keys as rabbitmq_keys,
};
use crate::mapping::mapper::{ContextMapper, MappedContext, clone_for_target};
use shunt_core::{DispatchContext, headers};

/// Maps a RabbitMQ-shaped context onto Kafka.
///
/// Fields with a natural Kafka slot translate directly (routing key becomes
/// the partitioning key); fields without one ride across as `x-*` headers,
/// from which the [reverse mapper](KafkaToRabbitMqMapper) can restore them:
///
/// | RabbitMQ field | Kafka slot |
/// |---|---|
/// | routing key | key |
/// | priority | header `x-priority` |
/// | expiration | header `x-expiration` |
/// | reply-to | header `x-reply-to` |
#[derive(Debug, Clone, Copy, Default)]
pub struct RabbitMqToKafkaMapper;

impl ContextMapper for RabbitMqToKafkaMapper {
    fn map(&self, source: &DispatchContext, target_transport: &str) -> MappedContext {
        let mut target = KafkaContext::new(clone_for_target(source, target_transport));

        if let Some(routing_key) = source.transport_property::<String>(rabbitmq_keys::ROUTING_KEY)
        {
            target.set_key(routing_key);
        }

        if let Some(priority) = source.transport_property::<u8>(rabbitmq_keys::PRIORITY) {
            // Never empty, cannot fail
            let _ = target
                .headers_mut()
                .set(headers::PRIORITY, Some(priority.to_string()));
        }

        if let Some(expiration) = source.transport_property::<String>(rabbitmq_keys::EXPIRATION) {
            let _ = target
                .headers_mut()
                .set(headers::EXPIRATION, Some(expiration));
        }

        if let Some(reply_to) = source.transport_property::<String>(rabbitmq_keys::REPLY_TO) {
            let _ = target.headers_mut().set(headers::REPLY_TO, Some(reply_to));
        }

        // The Kafka context must not keep carrying RabbitMQ fields
        for key in [
            rabbitmq_keys::EXCHANGE,
            rabbitmq_keys::ROUTING_KEY,
            rabbitmq_keys::PRIORITY,
            rabbitmq_keys::EXPIRATION,
            rabbitmq_keys::REPLY_TO,
            rabbitmq_keys::DELIVERY_MODE,
        ] {
            target.transport_properties_mut().remove(key);
        }

        MappedContext::Kafka(target)
    }
}

/// Maps a Kafka-shaped context onto RabbitMQ, reversing
/// [`RabbitMqToKafkaMapper`].
///
/// The partitioning key becomes the routing key; the `x-*` carrier headers
/// restore priority, expiration, and reply-to. A priority outside `0..=255`
/// is not restorable and comes back as absent, not as a failure. Delivery
/// mode is forced to persistent: a message that crossed a broker boundary
/// has already proven it must not be lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaToRabbitMqMapper;

impl ContextMapper for KafkaToRabbitMqMapper {
    fn map(&self, source: &DispatchContext, target_transport: &str) -> MappedContext {
        let mut target = RabbitMqContext::new(clone_for_target(source, target_transport));

        if let Some(key) = source.transport_property::<String>(kafka_keys::KEY) {
            target.set_routing_key(key);
        }

        if let Some(priority) = source.headers().get(headers::PRIORITY) {
            // Out-of-range values are dropped, not reported
            if let Ok(priority) = priority.parse::<u8>() {
                target.set_priority(priority);
            }
        }

        if let Some(expiration) = source.headers().get(headers::EXPIRATION) {
            let expiration = expiration.to_owned();
            target.set_expiration(expiration);
        }

        if let Some(reply_to) = source.headers().get(headers::REPLY_TO) {
            let reply_to = reply_to.to_owned();
            target.set_reply_to(reply_to);
        }

        target.set_delivery_mode(DELIVERY_MODE_PERSISTENT);

        // Drop the Kafka fields and the carrier headers this mapper consumed
        for key in [kafka_keys::TOPIC, kafka_keys::KEY, kafka_keys::PARTITION] {
            target.transport_properties_mut().remove(key);
        }
        for header in [headers::PRIORITY, headers::EXPIRATION, headers::REPLY_TO] {
            target.headers_mut().remove(header);
        }

        MappedContext::RabbitMq(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_rabbitmq_source() -> RabbitMqContext {
        let mut context = DispatchContext::with_message_id("m3");
        context.set_correlation_id("corr-1");
        context.set_causation_id("m2");
        context.set_source_transport("rabbitmq");

        let mut context = RabbitMqContext::new(context);
        context.set_routing_key("orders.created");
        context.set_priority(5);
        context.set_expiration("60000");
        context.set_reply_to("rq");

        context
    }

    #[test]
    fn rabbitmq_fields_land_in_their_kafka_slots() {
        // Given
        let source = make_rabbitmq_source();

        // When
        let mapped = RabbitMqToKafkaMapper.map(&source, "kafka");
        let MappedContext::Kafka(kafka) = mapped else {
            panic!("expected a Kafka context");
        };

        // Then
        assert_eq!(kafka.key(), Some("orders.created".to_owned()));
        assert_eq!(kafka.headers().get("x-priority"), Some("5"));
        assert_eq!(kafka.headers().get("x-expiration"), Some("60000"));
        assert_eq!(kafka.headers().get("x-reply-to"), Some("rq"));
        assert_eq!(kafka.transport_property::<String>("rabbitmq.routing_key"), None);
    }

    #[test]
    fn round_trip_preserves_every_mapped_field() {
        // Given
        let source = make_rabbitmq_source();

        // When: RabbitMQ -> Kafka -> RabbitMQ
        let kafka = RabbitMqToKafkaMapper.map(&source, "kafka").into_context();
        let MappedContext::RabbitMq(restored) = KafkaToRabbitMqMapper.map(&kafka, "rabbitmq")
        else {
            panic!("expected a RabbitMQ context");
        };

        // Then
        assert_eq!(restored.message_id(), "m3");
        assert_eq!(restored.correlation_id(), Some("corr-1"));
        assert_eq!(restored.causation_id(), Some("m2"));
        assert_eq!(restored.routing_key(), Some("orders.created".to_owned()));
        assert_eq!(restored.priority(), Some(5));
        assert_eq!(restored.expiration(), Some("60000".to_owned()));
        assert_eq!(restored.reply_to(), Some("rq".to_owned()));
        assert_eq!(restored.delivery_mode(), Some(DELIVERY_MODE_PERSISTENT));

        // And: the carrier headers were consumed
        assert!(!restored.headers().contains("x-priority"));
        assert!(!restored.headers().contains("x-expiration"));
        assert!(!restored.headers().contains("x-reply-to"));
    }

    #[test]
    fn priority_zero_survives_the_round_trip() {
        // Given
        let mut source = make_rabbitmq_source();
        source.set_priority(0);

        // When
        let kafka = RabbitMqToKafkaMapper.map(&source, "kafka").into_context();
        let MappedContext::RabbitMq(restored) = KafkaToRabbitMqMapper.map(&kafka, "rabbitmq")
        else {
            panic!("expected a RabbitMQ context");
        };

        // Then
        assert_eq!(restored.priority(), Some(0));
    }

    #[test]
    fn an_out_of_range_priority_restores_as_absent() {
        // Given: a Kafka context whose priority header no u8 can hold
        let mut kafka = DispatchContext::with_message_id("m4");
        kafka
            .headers_mut()
            .set("x-priority", Some("300"))
            .unwrap();

        // When
        let MappedContext::RabbitMq(restored) = KafkaToRabbitMqMapper.map(&kafka, "rabbitmq")
        else {
            panic!("expected a RabbitMQ context");
        };

        // Then: absent, not an error
        assert_eq!(restored.priority(), None);
        assert_eq!(restored.delivery_mode(), Some(DELIVERY_MODE_PERSISTENT));
    }
}
