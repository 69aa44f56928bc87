#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the adapter contract and its health facet.
mod adapter;
pub use self::adapter::{
    HealthReport, HealthStatus, TransportAdapter, TransportHealth, TransportType,
};

/// Exposes the wire-level message carrier.
mod message;
pub use self::message::TransportMessage;

/// Exposes the named adapter registry.
mod registry;
pub use self::registry::{TransportRegistration, TransportRegistry};

/// Exposes outbound bindings and endpoint pattern matching.
mod binding;
pub use self::binding::{BindingMatcher, TransportBinding, endpoint_pattern_matches};

/// Exposes the inbound router.
mod router;
pub use self::router::TransportRouter;

/// Exposes the outbound router.
mod outbound;
pub use self::outbound::OutboundRouter;

/// Exposes the startup validator.
mod validate;
pub use self::validate::{StartupValidator, ValidationConfig};

/// Exposes the transport-specialized context wrappers.
mod context {
    pub mod aws;
    pub mod azure;
    pub mod gcp;
    pub mod grpc;
    pub mod kafka;
    pub mod rabbitmq;
}

// Re-export context types
pub use self::context::aws::{SnsContext, SqsContext};
pub use self::context::azure::ServiceBusContext;
pub use self::context::gcp::PubSubContext;
pub use self::context::grpc::GrpcContext;
pub use self::context::kafka::KafkaContext;
pub use self::context::rabbitmq::RabbitMqContext;

/// Exposes message-context mapping between transports.
mod mapping {
    pub mod cross;
    pub mod layout;
    pub mod mapper;
    pub mod registry;
}

// Re-export mapping types
pub use self::mapping::cross::{KafkaToRabbitMqMapper, RabbitMqToKafkaMapper};
pub use self::mapping::layout::{
    GrpcMapping, KafkaMapping, MappingLayout, MappingLayoutBuilder, PubSubMapping,
    RabbitMqMapping, ServiceBusMapping, SnsMapping, SqsMapping, TransportMappings,
};
pub use self::mapping::mapper::{ContextMapper, DefaultMapper, MappedContext};
pub use self::mapping::registry::MapperRegistry;

/// Exposes the aggregate surface over all registered adapters.
mod multi;
pub use self::multi::MultiTransportAdapter;

/// Exposes health aggregation with policy controls.
mod health;
pub use self::health::{AggregateHealth, HealthAggregator, HealthConfig};

/// Exposes the in-process transport adapters.
mod adapters {
    pub mod cron;
    pub mod in_memory;
}

// Re-export adapter implementations
pub use self::adapters::cron::{CronEntry, CronScheduleConfig, CronTransport};
pub use self::adapters::in_memory::InMemoryTransport;
