use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime};

/// The lifecycle state of an inbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboxStatus {
    /// Recorded, not yet handled.
    Pending,
    /// Handled successfully.
    Processed,
    /// Handling failed. Entries may be failed from any state, including
    /// after having been processed.
    Failed,
}

impl Display for InboxStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InboxStatus::Pending => "pending",
            InboxStatus::Processed => "processed",
            InboxStatus::Failed => "failed",
        };

        f.write_str(name)
    }
}

/// The uniqueness key of an inbox entry: one message, one handler.
///
/// The same message delivered to two different handlers is two independent
/// entries; the same message arriving twice for the same handler is a
/// duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InboxKey {
    message_id: String,
    handler_key: String,
}

impl InboxKey {
    /// Creates a key from the given message ID and handler key.
    pub fn new(message_id: impl Into<String>, handler_key: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            handler_key: handler_key.into(),
        }
    }

    /// Reports the message ID.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Reports the handler key.
    pub fn handler_key(&self) -> &str {
        &self.handler_key
    }
}

/// One recorded inbound message.
#[derive(Debug, Clone)]
pub struct InboxEntry {
    key: InboxKey,
    message_type: String,
    payload: Vec<u8>,
    metadata: HashMap<String, String>,
    status: InboxStatus,
    created_at: SystemTime,
    last_status_change_at: SystemTime,
    error_reason: Option<String>,
}

impl InboxEntry {
    /// Creates a fresh entry in the [`Pending`](InboxStatus::Pending) state.
    pub(crate) fn new(
        key: InboxKey,
        message_type: impl Into<String>,
        payload: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Self {
        let now = SystemTime::now();

        Self {
            key,
            message_type: message_type.into(),
            payload,
            metadata,
            status: InboxStatus::Pending,
            created_at: now,
            last_status_change_at: now,
            error_reason: None,
        }
    }

    /// Reports the uniqueness key of this entry.
    pub fn key(&self) -> &InboxKey {
        &self.key
    }

    /// Reports the message ID of this entry.
    pub fn message_id(&self) -> &str {
        self.key.message_id()
    }

    /// Reports the handler key of this entry.
    pub fn handler_key(&self) -> &str {
        self.key.handler_key()
    }

    /// Reports the recorded message type.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Exposes the recorded payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Exposes the recorded metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Reports the current lifecycle state.
    pub fn status(&self) -> InboxStatus {
        self.status
    }

    /// Reports when this entry was recorded.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Reports when this entry last changed state.
    pub fn last_status_change_at(&self) -> SystemTime {
        self.last_status_change_at
    }

    /// Reports the failure reason, when the entry has failed.
    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    /// Moves this entry into the given state, stamping the change time.
    pub(crate) fn transition(&mut self, status: InboxStatus, error_reason: Option<String>) {
        self.status = status;
        self.error_reason = error_reason;
        self.last_status_change_at = SystemTime::now();
    }
}

/// A point-in-time census of an inbox store.
///
/// Every snapshot is internally consistent: each counted entry contributes
/// exactly one status, so `pending + processed + failed` never exceeds
/// `total` (and equals it in a quiescent store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InboxStatistics {
    /// The number of entries observed.
    pub total: usize,
    /// Entries awaiting handling.
    pub pending: usize,
    /// Entries handled successfully.
    pub processed: usize,
    /// Entries whose handling failed.
    pub failed: usize,
    /// The age of the oldest pending entry, if any entry is pending.
    pub oldest_pending_age: Option<Duration>,
}
