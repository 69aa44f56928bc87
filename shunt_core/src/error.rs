use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The classification of an error surfaced by the dispatch runtime.
///
/// Every fallible operation of the runtime reports one of these kinds, so
/// that callers can branch on the class of failure without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A null or empty argument where a value is required, or an unknown
    /// subscription scheme.
    InvalidArgument,
    /// An insert collided with an existing key: an inbox entry, a transport
    /// registration, or a handler registration.
    Duplicate,
    /// An operation referenced a key that does not exist.
    NotFound,
    /// A state transition that the current state does not permit.
    InvalidTransition,
    /// A typed invocation received a payload of the wrong runtime type.
    TypeMismatch,
    /// An operation on a store that has been disposed.
    Disposed,
    /// A cancellation token tripped before or during the operation.
    Cancelled,
    /// A startup or configuration precondition was not met.
    ConfigurationError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidTransition => "invalid transition",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Disposed => "disposed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::ConfigurationError => "configuration error",
        };

        f.write_str(name)
    }
}

/// An error surfaced by the dispatch runtime: a [`kind`](DispatchError::kind)
/// from the common taxonomy plus a human-readable description.
///
/// This same type doubles as the error descriptor carried inside a failed
/// [`DispatchResult`](crate::DispatchResult).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    kind: ErrorKind,
    message: String,
}

impl DispatchError {
    /// Creates an error of the given kind with the given description.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`InvalidArgument`](ErrorKind::InvalidArgument) error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Shorthand for a [`Duplicate`](ErrorKind::Duplicate) error.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, message)
    }

    /// Shorthand for a [`NotFound`](ErrorKind::NotFound) error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for an [`InvalidTransition`](ErrorKind::InvalidTransition)
    /// error.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTransition, message)
    }

    /// Shorthand for a [`TypeMismatch`](ErrorKind::TypeMismatch) error.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    /// Shorthand for a [`Disposed`](ErrorKind::Disposed) error.
    pub fn disposed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Disposed, message)
    }

    /// Shorthand for a [`Cancelled`](ErrorKind::Cancelled) error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Shorthand for a
    /// [`ConfigurationError`](ErrorKind::ConfigurationError) error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }

    /// Reports the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Reports the description of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}
