use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shunt_core::{
    DispatchContext, DispatchError, DispatchResult, Dispatchable, ErrorKind, MessageKind,
    kind_of_type_name, short_type_name,
};
use shunt_pipeline::FinalHandler;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A handler for one concrete message type.
///
/// Exactly one handler serves each message type; registering a second one
/// for the same type is a [`Duplicate`](ErrorKind::Duplicate) error. The
/// handler sits at the end of the middleware chain — whatever it returns is
/// the terminal dispatch result.
///
/// ## Example
///
/// ```
/// use async_trait::async_trait;
/// use shunt::{DispatchContext, DispatchResult, Dispatchable, Handler};
/// use tokio_util::sync::CancellationToken;
///
/// struct PlaceOrderCommand {
///     order_id: u64,
/// }
///
/// impl Dispatchable for PlaceOrderCommand {}
///
/// struct PlaceOrderHandler;
///
/// #[async_trait]
/// impl Handler<PlaceOrderCommand> for PlaceOrderHandler {
///     async fn handle(
///         &self,
///         message: &PlaceOrderCommand,
///         _context: &mut DispatchContext,
///         _token: &CancellationToken,
///     ) -> DispatchResult {
///         DispatchResult::success_with(message.order_id)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M: Dispatchable>: Send + Sync + 'static {
    /// Handles the message and produces the dispatch result.
    async fn handle(
        &self,
        message: &M,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult;
}

/// Adapts a typed [`Handler`] into the pipeline's type-erased
/// [`FinalHandler`] seat.
struct ErasedHandler<M, H> {
    inner: H,
    _message: PhantomData<fn(M)>,
}

#[async_trait]
impl<M, H> FinalHandler for ErasedHandler<M, H>
where
    M: Dispatchable,
    H: Handler<M>,
{
    async fn handle(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult {
        match message.as_any().downcast_ref::<M>() {
            Some(typed) => self.inner.handle(typed, context, token).await,
            None => DispatchResult::failure(
                ErrorKind::TypeMismatch,
                format!(
                    "handler '{}' received a message that is not a {}",
                    std::any::type_name::<H>(),
                    std::any::type_name::<M>(),
                ),
            ),
        }
    }
}

/// One registered handler, erased for the pipeline.
#[derive(Clone)]
pub(crate) struct HandlerEntry {
    pub(crate) handler_key: String,
    #[allow(dead_code)]
    pub(crate) message_type_name: &'static str,
    pub(crate) message_kind: MessageKind,
    pub(crate) handler: Arc<dyn FinalHandler>,
}

/// The registry of message handlers: one per concrete message type.
pub struct HandlerRegistry {
    handlers: DashMap<TypeId, HandlerEntry>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registers the given handler for message type `M`, keyed by the
    /// handler's short type name.
    ///
    /// Fails with [`Duplicate`](ErrorKind::Duplicate) when a handler for
    /// `M` is already registered.
    pub fn register<M, H>(&self, handler: H) -> Result<(), DispatchError>
    where
        M: Dispatchable,
        H: Handler<M>,
    {
        self.register_with_key::<M, H>(short_type_name(std::any::type_name::<H>()), handler)
    }

    /// Registers the given handler for message type `M` under an explicit
    /// handler key (the key half of the inbox's `(message id, handler key)`
    /// pair).
    pub fn register_with_key<M, H>(&self, handler_key: &str, handler: H) -> Result<(), DispatchError>
    where
        M: Dispatchable,
        H: Handler<M>,
    {
        let message_type_name = std::any::type_name::<M>();

        match self.handlers.entry(TypeId::of::<M>()) {
            Entry::Occupied(_) => Err(DispatchError::duplicate(format!(
                "a handler for message type '{}' is already registered",
                message_type_name,
            ))),
            Entry::Vacant(vacant) => {
                vacant.insert(HandlerEntry {
                    handler_key: handler_key.to_owned(),
                    message_type_name,
                    message_kind: kind_of_type_name(message_type_name),
                    handler: Arc::new(ErasedHandler::<M, H> {
                        inner: handler,
                        _message: PhantomData,
                    }),
                });

                debug!(
                    message_type = message_type_name,
                    handler = handler_key,
                    "Registered message handler",
                );

                Ok(())
            }
        }
    }

    /// Reports whether a handler is registered for message type `M`.
    pub fn has_handler<M: Dispatchable>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<M>())
    }

    /// Reports the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Reports whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Reports every registered message type with its declared kind, for
    /// pre-computing chains.
    pub fn known_messages(&self) -> Vec<(TypeId, MessageKind)> {
        self.handlers
            .iter()
            .map(|entry| (*entry.key(), entry.message_kind))
            .collect()
    }

    /// Resolves the handler entry for the given message type.
    pub(crate) fn resolve(&self, message_type: TypeId) -> Option<HandlerEntry> {
        self.handlers
            .get(&message_type)
            .map(|entry| entry.clone())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct PlaceOrderCommand;
    impl Dispatchable for PlaceOrderCommand {}

    struct PlaceOrderHandler;

    #[async_trait]
    impl Handler<PlaceOrderCommand> for PlaceOrderHandler {
        async fn handle(
            &self,
            _message: &PlaceOrderCommand,
            _context: &mut DispatchContext,
            _token: &CancellationToken,
        ) -> DispatchResult {
            DispatchResult::success()
        }
    }

    #[test]
    fn exactly_one_handler_per_message_type() {
        // Given
        let registry = HandlerRegistry::new();

        // When
        registry
            .register::<PlaceOrderCommand, _>(PlaceOrderHandler)
            .unwrap();
        let error = registry
            .register::<PlaceOrderCommand, _>(PlaceOrderHandler)
            .unwrap_err();

        // Then
        assert_eq!(error.kind(), ErrorKind::Duplicate);
        assert!(registry.has_handler::<PlaceOrderCommand>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn known_messages_carry_their_declared_kind() {
        // Given
        let registry = HandlerRegistry::new();
        registry
            .register::<PlaceOrderCommand, _>(PlaceOrderHandler)
            .unwrap();

        // When
        let known = registry.known_messages();

        // Then
        assert_eq!(known, vec![(TypeId::of::<PlaceOrderCommand>(), MessageKind::ACTION)]);
    }

    #[tokio::test]
    async fn the_erased_handler_rejects_a_foreign_message() {
        // Given
        struct OtherEvent;
        impl Dispatchable for OtherEvent {}

        let registry = HandlerRegistry::new();
        registry
            .register::<PlaceOrderCommand, _>(PlaceOrderHandler)
            .unwrap();
        let entry = registry.resolve(TypeId::of::<PlaceOrderCommand>()).unwrap();

        // When: the erased handler is fed the wrong runtime type
        let mut context = DispatchContext::with_message_id("m-1");
        let result = entry
            .handler
            .handle(&OtherEvent, &mut context, &CancellationToken::new())
            .await;

        // Then
        assert!(!result.succeeded());
        assert_eq!(result.error().unwrap().kind(), ErrorKind::TypeMismatch);
    }
}
