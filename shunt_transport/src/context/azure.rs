use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the Azure Service Bus context.
///
/// Service Bus properties ride under plain names, with no transport prefix.
pub mod keys {
    /// The session this message belongs to.
    pub const SESSION_ID: &str = "session_id";
    /// The partition key.
    pub const PARTITION_KEY: &str = "partition_key";
}

/// A [`DispatchContext`] specialized for Azure Service Bus.
#[derive(Debug, Clone)]
pub struct ServiceBusContext {
    inner: DispatchContext,
}

impl ServiceBusContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the session ID, if set.
    pub fn session_id(&self) -> Option<String> {
        self.inner.transport_property(keys::SESSION_ID)
    }

    /// Sets the session ID.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.inner
            .set_transport_property(keys::SESSION_ID, session_id.into());
    }

    /// Reports the partition key, if set.
    pub fn partition_key(&self) -> Option<String> {
        self.inner.transport_property(keys::PARTITION_KEY)
    }

    /// Sets the partition key.
    pub fn set_partition_key(&mut self, partition_key: impl Into<String>) {
        self.inner
            .set_transport_property(keys::PARTITION_KEY, partition_key.into());
    }
}

impl Deref for ServiceBusContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ServiceBusContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for ServiceBusContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}
