use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the Pub/Sub context.
pub mod keys {
    /// The target topic.
    pub const TOPIC: &str = "gcp.pubsub.topic";
    /// The ordering key.
    pub const ORDERING_KEY: &str = "gcp.pubsub.ordering_key";
}

/// A [`DispatchContext`] specialized for Google Cloud Pub/Sub.
#[derive(Debug, Clone)]
pub struct PubSubContext {
    inner: DispatchContext,
}

impl PubSubContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the target topic, if set.
    pub fn topic(&self) -> Option<String> {
        self.inner.transport_property(keys::TOPIC)
    }

    /// Sets the target topic.
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.inner.set_transport_property(keys::TOPIC, topic.into());
    }

    /// Reports the ordering key, if set.
    pub fn ordering_key(&self) -> Option<String> {
        self.inner.transport_property(keys::ORDERING_KEY)
    }

    /// Sets the ordering key.
    pub fn set_ordering_key(&mut self, ordering_key: impl Into<String>) {
        self.inner
            .set_transport_property(keys::ORDERING_KEY, ordering_key.into());
    }
}

impl Deref for PubSubContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PubSubContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for PubSubContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}
