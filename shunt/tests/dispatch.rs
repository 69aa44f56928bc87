use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use shunt::inbox::{InboxConfig, InboxStatus, InboxStore};
use shunt::pipeline::{Middleware, MiddlewareRegistration, Next};
use shunt::transport::{
    ContextMapper, HealthAggregator, HealthConfig, HealthStatus, InMemoryTransport,
    KafkaToRabbitMqMapper, MappedContext, RabbitMqContext, RabbitMqToKafkaMapper,
    StartupValidator, TransportAdapter, TransportMessage, TransportRegistry, TransportRouter,
    TransportType, ValidationConfig,
};
use shunt::{
    DispatchContext, DispatchResult, Dispatchable, Dispatcher, ErrorKind, Handler,
    InboundDispatcher, PropertyMap,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A message with an explicit action kind.
struct ReconcileLedgerCommand;
impl Dispatchable for ReconcileLedgerCommand {}

/// A handler that counts its invocations and reports success.
struct CountingHandler {
    invocations: Arc<Mutex<usize>>,
}

#[async_trait]
impl Handler<ReconcileLedgerCommand> for CountingHandler {
    async fn handle(
        &self,
        _message: &ReconcileLedgerCommand,
        _context: &mut DispatchContext,
        _token: &CancellationToken,
    ) -> DispatchResult {
        *self.invocations.lock() += 1;

        DispatchResult::success()
    }
}

/// A middleware that appends `{name}-before` and `{name}-after` around its
/// continuation.
struct Tracer {
    name: &'static str,
    trace: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Middleware for Tracer {
    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult {
        self.trace.lock().push(format!("{}-before", self.name));
        let result = next.run(message, context, token).await;
        self.trace.lock().push(format!("{}-after", self.name));

        result
    }
}

/// A handler that appends to the shared trace.
struct TracingHandler {
    trace: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Handler<ReconcileLedgerCommand> for TracingHandler {
    async fn handle(
        &self,
        _message: &ReconcileLedgerCommand,
        _context: &mut DispatchContext,
        _token: &CancellationToken,
    ) -> DispatchResult {
        self.trace.lock().push("final".to_owned());

        DispatchResult::success()
    }
}

#[tokio::test]
async fn an_empty_chain_reaches_the_handler_exactly_once() {
    // Given
    let invocations = Arc::new(Mutex::new(0));
    let dispatcher = Dispatcher::builder().build();
    dispatcher
        .handlers()
        .register::<ReconcileLedgerCommand, _>(CountingHandler {
            invocations: Arc::clone(&invocations),
        })
        .unwrap();

    // When
    let mut context = DispatchContext::with_message_id("m1");
    let result = dispatcher
        .dispatch(
            Arc::new(ReconcileLedgerCommand),
            &mut context,
            &CancellationToken::new(),
        )
        .await;

    // Then
    assert!(result.succeeded());
    assert_eq!(*invocations.lock(), 1);
}

#[tokio::test]
async fn middlewares_wrap_the_handler_in_configured_order() {
    // Given
    let trace = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::builder()
        .with_middleware(MiddlewareRegistration::new(Tracer {
            name: "m1",
            trace: Arc::clone(&trace),
        }))
        .with_middleware(MiddlewareRegistration::new(Tracer {
            name: "m2",
            trace: Arc::clone(&trace),
        }))
        .build();
    dispatcher
        .handlers()
        .register::<ReconcileLedgerCommand, _>(TracingHandler {
            trace: Arc::clone(&trace),
        })
        .unwrap();

    // When
    let mut context = DispatchContext::with_message_id("m2");
    let result = dispatcher
        .dispatch(
            Arc::new(ReconcileLedgerCommand),
            &mut context,
            &CancellationToken::new(),
        )
        .await;

    // Then
    assert!(result.succeeded());
    assert_eq!(
        *trace.lock(),
        vec!["m1-before", "m2-before", "final", "m2-after", "m1-after"],
    );
}

#[tokio::test]
async fn the_inbox_suppresses_a_second_delivery_of_the_same_message() {
    // Given
    let invocations = Arc::new(Mutex::new(0));
    let inbox = InboxStore::new(InboxConfig::default());
    let dispatcher = Dispatcher::builder().with_inbox(Arc::clone(&inbox)).build();
    dispatcher
        .handlers()
        .register::<ReconcileLedgerCommand, _>(CountingHandler {
            invocations: Arc::clone(&invocations),
        })
        .unwrap();

    // When: the same message id arrives twice
    for _ in 0..2 {
        let mut context = DispatchContext::with_message_id("msg-1");
        let result = dispatcher
            .dispatch(
                Arc::new(ReconcileLedgerCommand),
                &mut context,
                &CancellationToken::new(),
            )
            .await;
        assert!(result.succeeded());
    }

    // Then: the handler ran once, and the entry is processed
    assert_eq!(*invocations.lock(), 1);
    let entry = inbox
        .get_entry("msg-1", "CountingHandler")
        .unwrap()
        .unwrap();
    assert_eq!(entry.status(), InboxStatus::Processed);
}

#[tokio::test]
async fn a_failed_dispatch_after_processing_overrides_the_inbox_entry() {
    // Given
    let inbox = InboxStore::new(InboxConfig::default());
    let dispatcher = Dispatcher::builder().with_inbox(Arc::clone(&inbox)).build();
    dispatcher
        .handlers()
        .register_with_key::<ReconcileLedgerCommand, _>(
            "h",
            CountingHandler {
                invocations: Arc::new(Mutex::new(0)),
            },
        )
        .unwrap();

    // When: processed through the dispatcher, then failed out-of-band
    let mut context = DispatchContext::with_message_id("msg-2");
    dispatcher
        .dispatch(
            Arc::new(ReconcileLedgerCommand),
            &mut context,
            &CancellationToken::new(),
        )
        .await;
    inbox.mark_failed("msg-2", "h", "poison message").unwrap();

    // Then
    let entry = inbox.get_entry("msg-2", "h").unwrap().unwrap();
    assert_eq!(entry.status(), InboxStatus::Failed);
    assert_eq!(entry.error_reason(), Some("poison message"));
}

#[tokio::test]
async fn a_wire_message_travels_adapter_router_pipeline_handler() {
    // Given: a handler for raw wire messages
    struct WireHandler {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Handler<TransportMessage> for WireHandler {
        async fn handle(
            &self,
            message: &TransportMessage,
            context: &mut DispatchContext,
            _token: &CancellationToken,
        ) -> DispatchResult {
            self.seen.lock().push(format!(
                "{}:{}:{}",
                context.source_transport().unwrap_or("?"),
                message.type_name().unwrap_or("?"),
                context.message_id(),
            ));

            DispatchResult::success()
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Arc::new(Dispatcher::builder().build());
    dispatcher
        .handlers()
        .register::<TransportMessage, _>(WireHandler {
            seen: Arc::clone(&seen),
        })
        .unwrap();

    let adapter = InMemoryTransport::new("loopback");
    adapter.start().await.unwrap();

    // When: the adapter receives a wire message
    let message = TransportMessage::new(b"{}".to_vec())
        .with_message_id("wire-1")
        .with_type_name("orders.OrderPlacedEvent");
    let result = adapter
        .receive(
            message,
            dispatcher.as_ref() as &dyn InboundDispatcher,
            &CancellationToken::new(),
        )
        .await;

    // Then
    assert!(result.succeeded());
    assert_eq!(
        *seen.lock(),
        vec!["loopback:orders.OrderPlacedEvent:wire-1"],
    );

    // And: the router path stamps the adapter it was given
    let routed = TransportRouter::new(Arc::clone(&dispatcher) as Arc<dyn InboundDispatcher>)
        .route(
            Arc::new(
                TransportMessage::new(Vec::new())
                    .with_message_id("wire-2")
                    .with_type_name("orders.OrderPlacedEvent"),
            ),
            DispatchContext::with_message_id("wire-2"),
            "edge",
            &CancellationToken::new(),
        )
        .await;
    assert!(routed.succeeded());
    assert_eq!(seen.lock().len(), 2);
    assert!(seen.lock()[1].starts_with("edge:"));
}

#[tokio::test]
async fn a_rabbitmq_context_round_trips_through_kafka() {
    // Given
    let mut source = RabbitMqContext::new(DispatchContext::with_message_id("m3"));
    source.set_routing_key("orders.created");
    source.set_priority(5);
    source.set_expiration("60000");
    source.set_reply_to("rq");

    // When
    let kafka = RabbitMqToKafkaMapper.map(&source, "kafka").into_context();
    let MappedContext::RabbitMq(restored) = KafkaToRabbitMqMapper.map(&kafka, "rabbitmq") else {
        panic!("expected a RabbitMQ context");
    };

    // Then
    assert_eq!(restored.message_id(), "m3");
    assert_eq!(restored.routing_key(), Some("orders.created".to_owned()));
    assert_eq!(restored.priority(), Some(5));
    assert_eq!(restored.expiration(), Some("60000".to_owned()));
    assert_eq!(restored.reply_to(), Some("rq".to_owned()));
}

#[tokio::test]
async fn startup_fails_actionably_when_no_default_is_designated() {
    // Given
    let registry = TransportRegistry::new();
    for name in ["rabbit", "kafka"] {
        registry
            .register_transport(
                name,
                Arc::new(InMemoryTransport::new(name)) as Arc<dyn TransportAdapter>,
                TransportType::InMemory,
                PropertyMap::new(),
            )
            .unwrap();
    }

    // When
    let error = StartupValidator::new(ValidationConfig::default())
        .validate(&registry)
        .unwrap_err();

    // Then: the message names both transports and the remedial call
    assert_eq!(error.kind(), ErrorKind::ConfigurationError);
    assert!(error.message().contains("rabbit"));
    assert!(error.message().contains("kafka"));
    assert!(error.message().contains("set_default_transport"));
}

#[tokio::test]
async fn the_health_verdict_follows_the_default_transport() {
    // Given: rabbit healthy (started), kafka unhealthy (never started)
    let registry = Arc::new(TransportRegistry::new());
    for name in ["rabbit", "kafka"] {
        registry
            .register_transport(
                name,
                Arc::new(InMemoryTransport::new(name)) as Arc<dyn TransportAdapter>,
                TransportType::InMemory,
                PropertyMap::new(),
            )
            .unwrap();
    }
    registry
        .get_transport_adapter("rabbit")
        .unwrap()
        .start()
        .await
        .unwrap();

    let config: HealthConfig =
        serde_json::from_str(r#"{"require_default_transport_healthy": true}"#).unwrap();

    // When: the healthy transport is the default
    registry.set_default_transport("rabbit").unwrap();
    let aggregate = HealthAggregator::new(Arc::clone(&registry), config.clone())
        .check(&CancellationToken::new())
        .await;

    // Then
    assert_eq!(aggregate.status(), HealthStatus::Degraded);

    // When: the unhealthy transport becomes the default
    registry.set_default_transport("kafka").unwrap();
    let aggregate = HealthAggregator::new(Arc::clone(&registry), config)
        .check(&CancellationToken::new())
        .await;

    // Then
    assert_eq!(aggregate.status(), HealthStatus::Unhealthy);
}

#[tokio::test]
async fn a_missing_handler_is_a_not_found_failure() {
    // Given
    let dispatcher = Dispatcher::builder().build();

    // When
    let mut context = DispatchContext::with_message_id("m-unhandled");
    let result = dispatcher
        .dispatch(
            Arc::new(ReconcileLedgerCommand),
            &mut context,
            &CancellationToken::new(),
        )
        .await;

    // Then
    assert!(!result.succeeded());
    assert_eq!(result.error().unwrap().kind(), ErrorKind::NotFound);
}
