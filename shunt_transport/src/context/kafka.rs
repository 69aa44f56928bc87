use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the Kafka context.
pub mod keys {
    /// The target topic.
    pub const TOPIC: &str = "kafka.topic";
    /// The partitioning key.
    pub const KEY: &str = "kafka.key";
    /// The explicit partition, when pinned.
    pub const PARTITION: &str = "kafka.partition";
}

/// A [`DispatchContext`] specialized for Kafka.
#[derive(Debug, Clone)]
pub struct KafkaContext {
    inner: DispatchContext,
}

impl KafkaContext {
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

    /// Reports the partitioning key, if set.
    pub fn key(&self) -> Option<String> {
        self.inner.transport_property(keys::KEY)
    }

    /// Sets the partitioning key.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.inner.set_transport_property(keys::KEY, key.into());
    }

    /// Reports the pinned partition, if set.
    pub fn partition(&self) -> Option<i32> {
        self.inner.transport_property(keys::PARTITION)
    }

    /// Pins an explicit partition.
    pub fn set_partition(&mut self, partition: i32) {
        self.inner.set_transport_property(keys::PARTITION, partition);
    }
}

impl Deref for KafkaContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for KafkaContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for KafkaContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}
