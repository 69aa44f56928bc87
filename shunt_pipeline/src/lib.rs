#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the middleware contract and the continuation handle.
mod middleware;
pub use self::middleware::{FinalHandler, Middleware, MiddlewareStage, Next};

/// Exposes the chain cursor.
mod cursor;
pub use self::cursor::ChainCursor;

/// Exposes middleware registration and the applicability machinery.
mod applicability;
pub use self::applicability::{
    Applicability, ApplicabilityEvaluator, FeatureSet, MiddlewareRegistration,
};

/// Exposes chain compilation and execution.
mod chain;
pub use self::chain::{Chain, ChainBuilder};

/// Exposes the pipeline entry points.
mod invoker;
pub use self::invoker::{FilteredInvoker, InvokerConfig, PipelineInvoker};

/// Exposes pipeline profiles.
mod profile;
pub use self::profile::{PROFILE_INTERNAL_EVENT, PROFILE_STRICT, PipelineProfile};
