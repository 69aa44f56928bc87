use crate::{MessageKind, kind_of_type_name};
use std::any::{Any, TypeId};

/// Exposes a value as [`Any`], enabling downcasting through trait objects.
///
/// Blanket-implemented for every `'static` type; message implementations
/// never need to write this by hand.
pub trait AsAny {
    /// Exposes this value as [`Any`].
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A message that can be driven through the dispatch pipeline.
///
/// Implementations are plain data types. The only obligation is being
/// `Send + Sync + 'static`; both provided methods have sensible defaults.
///
/// ## Kind
///
/// A message that knows its [`MessageKind`] should override
/// [`kind`](Dispatchable::kind). For messages that do not, the default
/// derives the kind from the conventional suffix of the type name
/// ([`kind_of_type_name`]): this is what transports rely on when they ingest
/// foreign messages that carry no kind marker.
///
/// ## Example
///
/// ```
/// use shunt_core::{Dispatchable, MessageKind};
///
/// struct OrderPlacedEvent {
///     order_id: u64,
/// }
///
/// impl Dispatchable for OrderPlacedEvent {}
///
/// let message = OrderPlacedEvent { order_id: 17 };
/// assert_eq!(message.kind(), MessageKind::EVENT);
/// # let _ = message.order_id;
/// ```
pub trait Dispatchable: AsAny + Send + Sync + 'static {
    /// Reports the kind of this message.
    ///
    /// The default implementation applies the suffix convention to this
    /// type's name.
    fn kind(&self) -> MessageKind {
        kind_of_type_name(std::any::type_name::<Self>())
    }

    /// Reports the full type path of this message.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Reports the type tag of the expected response, for request/response
    /// messages. The runtime never reflects over it; the tag exists so that
    /// typed invocation sites can assert against it.
    fn response_type(&self) -> Option<TypeId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct ReconcileLedgerCommand;
    struct LedgerReconciledEvent;
    struct Unsuffixed;

    impl Dispatchable for ReconcileLedgerCommand {}
    impl Dispatchable for LedgerReconciledEvent {}
    impl Dispatchable for Unsuffixed {}

    struct DeclaredDocument;

    impl Dispatchable for DeclaredDocument {
        fn kind(&self) -> MessageKind {
            MessageKind::DOCUMENT
        }
    }

    #[test]
    fn default_kind_follows_suffix() {
        assert_eq!(ReconcileLedgerCommand.kind(), MessageKind::ACTION);
        assert_eq!(LedgerReconciledEvent.kind(), MessageKind::EVENT);
        assert_eq!(Unsuffixed.kind(), MessageKind::ACTION);
    }

    #[test]
    fn declared_kind_wins() {
        assert_eq!(DeclaredDocument.kind(), MessageKind::DOCUMENT);
    }

    #[test]
    fn downcasts_through_trait_object() {
        // Given
        let message: &dyn Dispatchable = &ReconcileLedgerCommand;

        // Then
        assert!(
            message
                .as_any()
                .downcast_ref::<ReconcileLedgerCommand>()
                .is_some()
        );
        assert!(
            message
                .as_any()
                .downcast_ref::<LedgerReconciledEvent>()
                .is_none()
        );
    }

    #[test]
    fn no_response_type_by_default() {
        assert_eq!(Unsuffixed.response_type(), None);
    }
}
