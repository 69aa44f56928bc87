#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes the inbox configuration section.
mod config;
pub use self::config::InboxConfig;

/// Exposes the inbox entries and statistics.
mod entry;
pub use self::entry::{InboxEntry, InboxKey, InboxStatistics, InboxStatus};

/// Exposes the inbox store itself.
mod store;
pub use self::store::InboxStore;
