#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the fixed set of message kinds and the type-name detection table.
mod kind;
pub use self::kind::{MessageKind, kind_of_type_name, short_type_name};

/// Exposes the dispatchable message trait.
mod message;
pub use self::message::{AsAny, Dispatchable};

/// Exposes the case-insensitive, case-preserving, insertion-ordered map.
mod caseless;
pub use self::caseless::{CaselessMap, eq_names};

/// Exposes the header map with its well-known header names.
mod header;
pub use self::header::{HeaderMap, headers};

/// Exposes the untyped property values and the property bag.
mod value;
pub use self::value::{FromPropertyValue, IntoPropertyValue, PropertyMap, PropertyValue};

/// Exposes the per-dispatch message context.
mod context;
pub use self::context::DispatchContext;

/// Exposes the uniform result protocol of the dispatch pipeline.
mod result;
pub use self::result::{DispatchResult, MiddlewareFlow, TypedResult};

/// Exposes the common error taxonomy.
mod error;
pub use self::error::{DispatchError, ErrorKind};

/// Exposes the seam between the transport layer and the dispatch pipeline.
mod dispatcher;
pub use self::dispatcher::InboundDispatcher;

/// Exposes serde support for durations in configuration sections.
pub mod serde_duration;
