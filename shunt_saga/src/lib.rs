#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the index configuration section.
mod config;
pub use self::config::SagaIndexConfig;

/// Exposes the saga records.
mod record;
pub use self::record::{SagaRecord, SagaStatus};

/// Exposes the correlation index itself.
mod index;
pub use self::index::CorrelationIndex;
