use crate::adapter::TransportType;
use crate::context::aws::{sns_attribute_key, sns_keys, sqs_attribute_key, sqs_keys};
use crate::context::azure::keys as azure_keys;
use crate::context::gcp::keys as gcp_keys;
use crate::context::grpc::keys as grpc_keys;
use crate::context::kafka::keys as kafka_keys;
use crate::context::rabbitmq::keys as rabbitmq_keys;
use shunt_core::{DispatchContext, eq_names, headers, short_type_name};

/// Static outbound mapping for RabbitMQ targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RabbitMqMapping {
    /// The target exchange.
    pub exchange: Option<String>,
    /// The routing key.
    pub routing_key: Option<String>,
}

impl RabbitMqMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target exchange.
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());

        self
    }

    /// Sets the routing key.
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = Some(routing_key.into());

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(exchange) = &self.exchange {
            context.set_transport_property(rabbitmq_keys::EXCHANGE, exchange.clone());
        }
        if let Some(routing_key) = &self.routing_key {
            context.set_transport_property(rabbitmq_keys::ROUTING_KEY, routing_key.clone());
        }
    }
}

/// Static outbound mapping for Kafka targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KafkaMapping {
    /// The target topic.
    pub topic: Option<String>,
    /// The partitioning key.
    pub key: Option<String>,
    /// An explicit partition.
    pub partition: Option<i32>,
}

impl KafkaMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());

        self
    }

    /// Sets the partitioning key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());

        self
    }

    /// Pins an explicit partition.
    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(topic) = &self.topic {
            context.set_transport_property(kafka_keys::TOPIC, topic.clone());
        }
        if let Some(key) = &self.key {
            context.set_transport_property(kafka_keys::KEY, key.clone());
        }
        if let Some(partition) = self.partition {
            context.set_transport_property(kafka_keys::PARTITION, partition);
        }
    }
}

/// Static outbound mapping for Azure Service Bus targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceBusMapping {
    /// The session to address.
    pub session_id: Option<String>,
    /// The partition key.
    pub partition_key: Option<String>,
}

impl ServiceBusMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session to address.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());

        self
    }

    /// Sets the partition key.
    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(session_id) = &self.session_id {
            context.set_transport_property(azure_keys::SESSION_ID, session_id.clone());
        }
        if let Some(partition_key) = &self.partition_key {
            context.set_transport_property(azure_keys::PARTITION_KEY, partition_key.clone());
        }
    }
}

/// Static outbound mapping for AWS SQS targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqsMapping {
    /// The FIFO message group.
    pub message_group_id: Option<String>,
    /// Message attributes.
    pub attributes: Vec<(String, String)>,
}

impl SqsMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the FIFO message group.
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());

        self
    }

    /// Adds a message attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(group_id) = &self.message_group_id {
            context.set_transport_property(sqs_keys::MESSAGE_GROUP_ID, group_id.clone());
        }
        for (name, value) in &self.attributes {
            context.set_transport_property(sqs_attribute_key(name), value.clone());
        }
    }
}

/// Static outbound mapping for AWS SNS targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnsMapping {
    /// The subject line.
    pub subject: Option<String>,
    /// Message attributes.
    pub attributes: Vec<(String, String)>,
}

impl SnsMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject line.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());

        self
    }

    /// Adds a message attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(subject) = &self.subject {
            context.set_transport_property(sns_keys::SUBJECT, subject.clone());
        }
        for (name, value) in &self.attributes {
            context.set_transport_property(sns_attribute_key(name), value.clone());
        }
    }
}

/// Static outbound mapping for Google Pub/Sub targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PubSubMapping {
    /// The target topic.
    pub topic: Option<String>,
    /// The ordering key.
    pub ordering_key: Option<String>,
}

impl PubSubMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());

        self
    }

    /// Sets the ordering key.
    pub fn with_ordering_key(mut self, ordering_key: impl Into<String>) -> Self {
        self.ordering_key = Some(ordering_key.into());

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(topic) = &self.topic {
            context.set_transport_property(gcp_keys::TOPIC, topic.clone());
        }
        if let Some(ordering_key) = &self.ordering_key {
            context.set_transport_property(gcp_keys::ORDERING_KEY, ordering_key.clone());
        }
    }
}

/// Static outbound mapping for gRPC targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrpcMapping {
    /// The fully-qualified method to invoke.
    pub method: Option<String>,
}

impl GrpcMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method to invoke.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());

        self
    }

    /// Writes this mapping into the given context.
    pub fn apply(&self, context: &mut DispatchContext) {
        if let Some(method) = &self.method {
            context.set_transport_property(grpc_keys::METHOD, method.clone());
        }
    }
}

/// The per-transport mapping records of one message type (or of the
/// transport-level defaults).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportMappings {
    /// The RabbitMQ mapping, if configured.
    pub rabbitmq: Option<RabbitMqMapping>,
    /// The Kafka mapping, if configured.
    pub kafka: Option<KafkaMapping>,
    /// The Azure Service Bus mapping, if configured.
    pub service_bus: Option<ServiceBusMapping>,
    /// The AWS SQS mapping, if configured.
    pub sqs: Option<SqsMapping>,
    /// The AWS SNS mapping, if configured.
    pub sns: Option<SnsMapping>,
    /// The Google Pub/Sub mapping, if configured.
    pub pubsub: Option<PubSubMapping>,
    /// The gRPC mapping, if configured.
    pub grpc: Option<GrpcMapping>,
}

impl TransportMappings {
    /// Creates an empty set of mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the RabbitMQ mapping.
    pub fn with_rabbitmq(mut self, mapping: RabbitMqMapping) -> Self {
        self.rabbitmq = Some(mapping);

        self
    }

    /// Sets the Kafka mapping.
    pub fn with_kafka(mut self, mapping: KafkaMapping) -> Self {
        self.kafka = Some(mapping);

        self
    }

    /// Sets the Azure Service Bus mapping.
    pub fn with_service_bus(mut self, mapping: ServiceBusMapping) -> Self {
        self.service_bus = Some(mapping);

        self
    }

    /// Sets the AWS SQS mapping.
    pub fn with_sqs(mut self, mapping: SqsMapping) -> Self {
        self.sqs = Some(mapping);

        self
    }

    /// Sets the AWS SNS mapping.
    pub fn with_sns(mut self, mapping: SnsMapping) -> Self {
        self.sns = Some(mapping);

        self
    }

    /// Sets the Google Pub/Sub mapping.
    pub fn with_pubsub(mut self, mapping: PubSubMapping) -> Self {
        self.pubsub = Some(mapping);

        self
    }

    /// Sets the gRPC mapping.
    pub fn with_grpc(mut self, mapping: GrpcMapping) -> Self {
        self.grpc = Some(mapping);

        self
    }

    /// Applies the mapping for the given target transport to the given
    /// context, if one is configured.
    pub fn apply(&self, context: &mut DispatchContext, target: TransportType) {
        match target {
            TransportType::RabbitMq => {
                if let Some(mapping) = &self.rabbitmq {
                    mapping.apply(context);
                }
            }
            TransportType::Kafka => {
                if let Some(mapping) = &self.kafka {
                    mapping.apply(context);
                }
            }
            TransportType::AzureServiceBus => {
                if let Some(mapping) = &self.service_bus {
                    mapping.apply(context);
                }
            }
            TransportType::AwsSqs => {
                if let Some(mapping) = &self.sqs {
                    mapping.apply(context);
                }
            }
            TransportType::AwsSns => {
                if let Some(mapping) = &self.sns {
                    mapping.apply(context);
                }
            }
            TransportType::GooglePubSub => {
                if let Some(mapping) = &self.pubsub {
                    mapping.apply(context);
                }
            }
            TransportType::Grpc => {
                if let Some(mapping) = &self.grpc {
                    mapping.apply(context);
                }
            }
            TransportType::InMemory | TransportType::Cron => {}
        }
    }
}

/// Associates message types with per-transport mapping records.
///
/// At map time, the
/// [`X-Message-Type`](shunt_core::headers::MESSAGE_TYPE) header of the
/// outbound context selects the entry: the full dotted type path and the
/// unqualified short name both match. When no type-specific entry matches,
/// the transport-level defaults apply.
#[derive(Debug, Clone, Default)]
pub struct MappingLayout {
    entries: Vec<(String, TransportMappings)>,
    defaults: TransportMappings,
}

impl MappingLayout {
    /// Returns a new [`MappingLayoutBuilder`].
    pub fn builder() -> MappingLayoutBuilder {
        MappingLayoutBuilder::new()
    }

    /// Finds the mappings configured for the given type name (full path or
    /// short name), falling back to the transport-level defaults.
    pub fn mappings_for(&self, type_name: Option<&str>) -> &TransportMappings {
        let Some(type_name) = type_name else {
            return &self.defaults;
        };

        self.entries
            .iter()
            .find(|(registered, _)| Self::type_names_match(registered, type_name))
            .map(|(_, mappings)| mappings)
            .unwrap_or(&self.defaults)
    }

    /// Applies the mapping selected by the context's
    /// [`X-Message-Type`](shunt_core::headers::MESSAGE_TYPE) header for the
    /// given target transport.
    pub fn apply(&self, context: &mut DispatchContext, target: TransportType) {
        let type_name = context
            .headers()
            .get(headers::MESSAGE_TYPE)
            .map(str::to_owned);

        self.mappings_for(type_name.as_deref()).apply(context, target);
    }

    /// Matches a registered type name against a header value: full paths
    /// and unqualified short names are interchangeable.
    fn type_names_match(registered: &str, header: &str) -> bool {
        eq_names(registered, header)
            || eq_names(short_dotted_name(registered), header)
            || eq_names(registered, short_dotted_name(header))
    }
}

/// Extracts the unqualified tail of a dotted (or double-colon) type path.
fn short_dotted_name(type_name: &str) -> &str {
    let tail = short_type_name(type_name);

    match tail.rfind('.') {
        Some(position) => &tail[position + 1..],
        None => tail,
    }
}

/// Builds a [`MappingLayout`] fluently.
///
/// ## Example
///
/// ```
/// use shunt_transport::{KafkaMapping, MappingLayout, RabbitMqMapping, TransportMappings};
///
/// let layout = MappingLayout::builder()
///     .with_default(
///         TransportMappings::new()
///             .with_rabbitmq(RabbitMqMapping::new().with_exchange("amq.topic")),
///     )
///     .with_message(
///         "orders.OrderPlacedEvent",
///         TransportMappings::new()
///             .with_kafka(KafkaMapping::new().with_topic("orders").with_key("order-id")),
///     )
///     .build();
/// # drop(layout);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MappingLayoutBuilder {
    entries: Vec<(String, TransportMappings)>,
    defaults: TransportMappings,
}

impl MappingLayoutBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport-level default mappings.
    pub fn with_default(mut self, defaults: TransportMappings) -> Self {
        self.defaults = defaults;

        self
    }

    /// Associates the given message type with the given mappings.
    pub fn with_message(
        mut self,
        type_name: impl Into<String>,
        mappings: TransportMappings,
    ) -> Self {
        self.entries.push((type_name.into(), mappings));

        self
    }

    /// Builds the layout.
    pub fn build(self) -> MappingLayout {
        MappingLayout {
            entries: self.entries,
            defaults: self.defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_layout() -> MappingLayout {
        MappingLayout::builder()
            .with_default(
                TransportMappings::new()
                    .with_rabbitmq(RabbitMqMapping::new().with_exchange("amq.topic")),
            )
            .with_message(
                "orders.OrderPlacedEvent",
                TransportMappings::new()
                    .with_kafka(
                        KafkaMapping::new()
                            .with_topic("orders")
                            .with_key("order-id")
                            .with_partition(3),
                    )
                    .with_rabbitmq(
                        RabbitMqMapping::new()
                            .with_exchange("orders.exchange")
                            .with_routing_key("orders.placed"),
                    ),
            )
            .build()
    }

    fn context_of_type(type_name: &str) -> DispatchContext {
        let mut context = DispatchContext::with_message_id("m-1");
        context
            .headers_mut()
            .set(headers::MESSAGE_TYPE, Some(type_name))
            .unwrap();

        context
    }

    #[test]
    fn the_full_type_path_selects_the_entry() {
        // Given
        let layout = make_layout();
        let mut context = context_of_type("orders.OrderPlacedEvent");

        // When
        layout.apply(&mut context, TransportType::Kafka);

        // Then
        assert_eq!(
            context.transport_property::<String>("kafka.topic"),
            Some("orders".to_owned()),
        );
        assert_eq!(context.transport_property::<i32>("kafka.partition"), Some(3));
    }

    #[test]
    fn the_short_name_selects_the_same_entry() {
        // Given
        let layout = make_layout();
        let mut context = context_of_type("OrderPlacedEvent");

        // When
        layout.apply(&mut context, TransportType::RabbitMq);

        // Then
        assert_eq!(
            context.transport_property::<String>("rabbitmq.routing_key"),
            Some("orders.placed".to_owned()),
        );
    }

    #[test]
    fn unknown_types_fall_back_to_the_defaults() {
        // Given
        let layout = make_layout();
        let mut context = context_of_type("billing.InvoiceIssuedEvent");

        // When
        layout.apply(&mut context, TransportType::RabbitMq);

        // Then
        assert_eq!(
            context.transport_property::<String>("rabbitmq.exchange"),
            Some("amq.topic".to_owned()),
        );
        assert_eq!(
            context.transport_property::<String>("rabbitmq.routing_key"),
            None,
        );
    }

    #[test]
    fn a_missing_type_header_uses_the_defaults() {
        // Given
        let layout = make_layout();
        let mut context = DispatchContext::with_message_id("m-2");

        // When
        layout.apply(&mut context, TransportType::RabbitMq);

        // Then
        assert_eq!(
            context.transport_property::<String>("rabbitmq.exchange"),
            Some("amq.topic".to_owned()),
        );
    }

    #[test]
    fn namespaced_properties_apply_for_the_cloud_targets() {
        // Given
        let layout = MappingLayout::builder()
            .with_message(
                "billing.SettleInvoiceCommand",
                TransportMappings::new()
                    .with_sqs(
                        SqsMapping::new()
                            .with_message_group_id("billing")
                            .with_attribute("priority", "high"),
                    )
                    .with_pubsub(PubSubMapping::new().with_ordering_key("invoice-id"))
                    .with_grpc(GrpcMapping::new().with_method("/billing.Billing/Settle"))
                    .with_service_bus(ServiceBusMapping::new().with_session_id("billing")),
            )
            .build();

        // When / Then: SQS
        let mut context = context_of_type("billing.SettleInvoiceCommand");
        layout.apply(&mut context, TransportType::AwsSqs);
        assert_eq!(
            context.transport_property::<String>("aws.sqs.message_group_id"),
            Some("billing".to_owned()),
        );
        assert_eq!(
            context.transport_property::<String>("aws.sqs.attr.priority"),
            Some("high".to_owned()),
        );

        // When / Then: Pub/Sub
        let mut context = context_of_type("billing.SettleInvoiceCommand");
        layout.apply(&mut context, TransportType::GooglePubSub);
        assert_eq!(
            context.transport_property::<String>("gcp.pubsub.ordering_key"),
            Some("invoice-id".to_owned()),
        );

        // When / Then: gRPC
        let mut context = context_of_type("billing.SettleInvoiceCommand");
        layout.apply(&mut context, TransportType::Grpc);
        assert_eq!(
            context.transport_property::<String>("grpc.method"),
            Some("/billing.Billing/Settle".to_owned()),
        );

        // When / Then: Service Bus rides under plain names
        let mut context = context_of_type("billing.SettleInvoiceCommand");
        layout.apply(&mut context, TransportType::AzureServiceBus);
        assert_eq!(
            context.transport_property::<String>("session_id"),
            Some("billing".to_owned()),
        );
    }
}
