#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the individual metric instruments.
mod instrument;
pub use self::instrument::{Counter, Gauge, Histogram, HistogramSummary, LabeledCounter};

/// Exposes the metric registry and its snapshots.
mod registry;
pub use self::registry::{MetricRegistry, MetricSnapshot, MetricValue};
