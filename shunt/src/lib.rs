#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Implements typed message handlers and their registry.
mod handler;
pub use self::handler::{Handler, HandlerRegistry};

/// Implements the dispatcher that wires the pipeline, the inbox, and the
/// handler registry together.
mod runtime;
pub use self::runtime::{Dispatcher, DispatcherBuilder};

/// Implements the stock middlewares.
mod stock;
pub use self::stock::{CorrelationMiddleware, MetricsMiddleware, TracingMiddleware};

/// Re-exports the public API of `shunt-core` in the root of this crate for
/// convenience.
pub use shunt_core::*;

/// Re-exports the public API of `shunt-pipeline` for convenience.
pub use shunt_pipeline as pipeline;

/// Re-exports the public API of `shunt-inbox` for convenience.
pub use shunt_inbox as inbox;

/// Re-exports the public API of `shunt-saga` for convenience.
pub use shunt_saga as saga;

/// Re-exports the public API of `shunt-transport` for convenience.
pub use shunt_transport as transport;

/// Re-exports the public API of `shunt-metrics` for convenience.
pub use shunt_metrics as metrics;

/// Re-exports the public API of `shunt-sync` for convenience.
pub use shunt_sync as sync;

/// Re-exports the public API of `tokio` for convenience.
pub use tokio;
