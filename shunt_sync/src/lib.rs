#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the background-workload supervisor.
mod spindown;
pub use self::spindown::{Spindown, WindDownReport, WorkToken};
