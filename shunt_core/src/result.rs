use crate::error::{DispatchError, ErrorKind};
use std::any::Any;

/// The uniform outcome of one end-to-end dispatch.
///
/// A result either succeeded (optionally carrying a typed payload produced by
/// the final handler) or failed with a [`DispatchError`] descriptor. Results
/// are immutable once constructed.
///
/// The payload is type-erased; [`into_typed`](DispatchResult::into_typed)
/// recovers it at the invocation site that knows the expected type.
#[derive(Debug)]
pub struct DispatchResult {
    succeeded: bool,
    payload: Option<Box<dyn Any + Send>>,
    error: Option<DispatchError>,
}

impl DispatchResult {
    /// Creates a succeeded result with no payload.
    pub fn success() -> Self {
        Self {
            succeeded: true,
            payload: None,
            error: None,
        }
    }

    /// Creates a succeeded result carrying the given payload.
    pub fn success_with<T: Any + Send>(payload: T) -> Self {
        Self {
            succeeded: true,
            payload: Some(Box::new(payload)),
            error: None,
        }
    }

    /// Creates a failed result with an error of the given kind and
    /// description.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::from_error(DispatchError::new(kind, message))
    }

    /// Creates a failed result from the given error.
    pub fn from_error(error: DispatchError) -> Self {
        Self {
            succeeded: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Reports whether the dispatch succeeded.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Exposes the error descriptor of a failed result.
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Reports whether a payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrows the payload as the requested type, if a payload is attached
    /// and its runtime type matches.
    pub fn payload_ref<T: Any>(&self) -> Option<&T> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.downcast_ref::<T>())
    }

    /// Consumes this result, asserting the payload type.
    ///
    /// An absent payload is legal and yields a typed result with no value. A
    /// payload of a different runtime type yields a failed result with a
    /// [`TypeMismatch`](ErrorKind::TypeMismatch) error.
    pub fn into_typed<T: Any + Send>(self) -> TypedResult<T> {
        let Self {
            succeeded,
            payload,
            error,
        } = self;

        match payload {
            None => TypedResult {
                succeeded,
                payload: None,
                error,
            },
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(typed) => TypedResult {
                    succeeded,
                    payload: Some(*typed),
                    error,
                },
                Err(_) => TypedResult {
                    succeeded: false,
                    payload: None,
                    error: Some(DispatchError::type_mismatch(format!(
                        "dispatch payload is not of the expected type {}",
                        std::any::type_name::<T>(),
                    ))),
                },
            },
        }
    }
}

impl From<DispatchError> for DispatchResult {
    fn from(error: DispatchError) -> Self {
        Self::from_error(error)
    }
}

/// A [`DispatchResult`] whose payload has been recovered into a concrete
/// type.
#[derive(Debug)]
pub struct TypedResult<T> {
    succeeded: bool,
    payload: Option<T>,
    error: Option<DispatchError>,
}

impl<T> TypedResult<T> {
    /// Reports whether the dispatch succeeded.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Exposes the typed payload, if one was attached.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Consumes this result, returning the typed payload, if one was
    /// attached.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Exposes the error descriptor of a failed result.
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }
}

/// The declared intent of a middleware that wants to steer the dispatch
/// without inspecting the rest of the chain.
///
/// Distinct from [`DispatchResult`]: a flow verdict is what a middleware
/// *decides*, while a dispatch result is what the pipeline ultimately
/// *returns*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareFlow {
    /// Proceed to the next middleware (or the final handler).
    Continue,
    /// Stop the chain, reporting overall success.
    StopWithSuccess,
    /// Stop the chain, reporting failure with the given description.
    StopWithError(String),
}

impl MiddlewareFlow {
    /// Reports whether the chain should proceed.
    pub fn should_continue(&self) -> bool {
        matches!(self, MiddlewareFlow::Continue)
    }

    /// Reports whether this verdict counts as a success.
    pub fn succeeded(&self) -> bool {
        !matches!(self, MiddlewareFlow::StopWithError(_))
    }

    /// Exposes the error description of a stop-with-error verdict.
    pub fn error(&self) -> Option<&str> {
        match self {
            MiddlewareFlow::StopWithError(message) => Some(message),
            _ => None,
        }
    }
}
