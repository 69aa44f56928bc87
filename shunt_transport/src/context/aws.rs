use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the SQS context. Message
/// attributes ride under [`sqs_attribute_key`].
pub mod sqs_keys {
    /// The FIFO message group.
    pub const MESSAGE_GROUP_ID: &str = "aws.sqs.message_group_id";
    /// The FIFO deduplication ID.
    pub const DEDUPLICATION_ID: &str = "aws.sqs.deduplication_id";
}

/// The stable transport-property names of the SNS context. Message
/// attributes ride under [`sns_attribute_key`].
pub mod sns_keys {
    /// The subject line.
    pub const SUBJECT: &str = "aws.sns.subject";
    /// The FIFO message group.
    #[allow(dead_code)]
    pub const MESSAGE_GROUP_ID: &str = "aws.sns.message_group_id";
}

/// Composes the property name of an SQS message attribute.
pub fn sqs_attribute_key(name: &str) -> String {
    format!("aws.sqs.attr.{}", name)
}

/// Composes the property name of an SNS message attribute.
pub fn sns_attribute_key(name: &str) -> String {
    format!("aws.sns.attr.{}", name)
}

/// A [`DispatchContext`] specialized for AWS SQS.
#[derive(Debug, Clone)]
pub struct SqsContext {
    inner: DispatchContext,
}

impl SqsContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the FIFO message group, if set.
    pub fn message_group_id(&self) -> Option<String> {
        self.inner.transport_property(sqs_keys::MESSAGE_GROUP_ID)
    }

    /// Sets the FIFO message group.
    pub fn set_message_group_id(&mut self, group_id: impl Into<String>) {
        self.inner
            .set_transport_property(sqs_keys::MESSAGE_GROUP_ID, group_id.into());
    }

    /// Reports the FIFO deduplication ID, if set.
    pub fn deduplication_id(&self) -> Option<String> {
        self.inner.transport_property(sqs_keys::DEDUPLICATION_ID)
    }

    /// Sets the FIFO deduplication ID.
    pub fn set_deduplication_id(&mut self, deduplication_id: impl Into<String>) {
        self.inner
            .set_transport_property(sqs_keys::DEDUPLICATION_ID, deduplication_id.into());
    }

    /// Sets a message attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.inner
            .set_transport_property(sqs_attribute_key(name), value.into());
    }

    /// Reports a message attribute, if set.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.transport_property(&sqs_attribute_key(name))
    }
}

impl Deref for SqsContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SqsContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for SqsContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}

/// A [`DispatchContext`] specialized for AWS SNS.
#[derive(Debug, Clone)]
pub struct SnsContext {
    inner: DispatchContext,
}

impl SnsContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the subject line, if set.
    pub fn subject(&self) -> Option<String> {
        self.inner.transport_property(sns_keys::SUBJECT)
    }

    /// Sets the subject line.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.inner
            .set_transport_property(sns_keys::SUBJECT, subject.into());
    }

    /// Sets a message attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.inner
            .set_transport_property(sns_attribute_key(name), value.into());
    }

    /// Reports a message attribute, if set.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.transport_property(&sns_attribute_key(name))
    }
}

impl Deref for SnsContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SnsContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for SnsContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}
