use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the RabbitMQ context.
///
/// Cross-transport mappers read these generically; the typed accessors on
/// [`RabbitMqContext`] are sugar over the same names.
pub mod keys {
    /// The target exchange.
    pub const EXCHANGE: &str = "rabbitmq.exchange";
    /// The routing key.
    pub const ROUTING_KEY: &str = "rabbitmq.routing_key";
    /// The message priority (`0..=255`).
    pub const PRIORITY: &str = "rabbitmq.priority";
    /// The per-message TTL, in milliseconds, as RabbitMQ carries it: a
    /// string.
    pub const EXPIRATION: &str = "rabbitmq.expiration";
    /// The reply-to queue name.
    pub const REPLY_TO: &str = "rabbitmq.reply_to";
    /// The delivery mode: `1` transient, `2` persistent.
    pub const DELIVERY_MODE: &str = "rabbitmq.delivery_mode";
}

/// The delivery mode value RabbitMQ treats as persistent.
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// A [`DispatchContext`] specialized for RabbitMQ.
///
/// The wrapper adds strongly-keyed accessors for the AMQP-specific fields;
/// the values live in the underlying transport-property bag under the
/// [`keys`] names, which is what lets a cross-transport mapper read them
/// without knowing this type.
#[derive(Debug, Clone)]
pub struct RabbitMqContext {
    inner: DispatchContext,
}

impl RabbitMqContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the target exchange, if set.
    pub fn exchange(&self) -> Option<String> {
        self.inner.transport_property(keys::EXCHANGE)
    }

    /// Sets the target exchange.
    pub fn set_exchange(&mut self, exchange: impl Into<String>) {
        self.inner
            .set_transport_property(keys::EXCHANGE, exchange.into());
    }

    /// Reports the routing key, if set.
    pub fn routing_key(&self) -> Option<String> {
        self.inner.transport_property(keys::ROUTING_KEY)
    }

    /// Sets the routing key.
    pub fn set_routing_key(&mut self, routing_key: impl Into<String>) {
        self.inner
            .set_transport_property(keys::ROUTING_KEY, routing_key.into());
    }

    /// Reports the message priority, if set.
    pub fn priority(&self) -> Option<u8> {
        self.inner.transport_property(keys::PRIORITY)
    }

    /// Sets the message priority.
    pub fn set_priority(&mut self, priority: u8) {
        self.inner.set_transport_property(keys::PRIORITY, priority);
    }

    /// Reports the per-message TTL, if set.
    pub fn expiration(&self) -> Option<String> {
        self.inner.transport_property(keys::EXPIRATION)
    }

    /// Sets the per-message TTL, in milliseconds, as a string.
    pub fn set_expiration(&mut self, expiration: impl Into<String>) {
        self.inner
            .set_transport_property(keys::EXPIRATION, expiration.into());
    }

    /// Reports the reply-to queue, if set.
    pub fn reply_to(&self) -> Option<String> {
        self.inner.transport_property(keys::REPLY_TO)
    }

    /// Sets the reply-to queue.
    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        self.inner
            .set_transport_property(keys::REPLY_TO, reply_to.into());
    }

    /// Reports the delivery mode, if set.
    pub fn delivery_mode(&self) -> Option<u8> {
        self.inner.transport_property(keys::DELIVERY_MODE)
    }

    /// Sets the delivery mode (`1` transient, `2` persistent).
    pub fn set_delivery_mode(&mut self, delivery_mode: u8) {
        self.inner
            .set_transport_property(keys::DELIVERY_MODE, delivery_mode);
    }
}

impl Deref for RabbitMqContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for RabbitMqContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for RabbitMqContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_accessors_read_the_stable_property_names() {
        // Given
        let mut context = RabbitMqContext::new(DispatchContext::with_message_id("m-1"));

        // When
        context.set_routing_key("orders.created");
        context.set_priority(5);

        // Then: readable both typed and generically
        assert_eq!(context.routing_key(), Some("orders.created".to_owned()));
        assert_eq!(
            context.transport_property::<String>(keys::ROUTING_KEY),
            Some("orders.created".to_owned()),
        );
        assert_eq!(context.transport_property::<u8>(keys::PRIORITY), Some(5));
    }

    #[test]
    fn priority_zero_is_a_value_not_an_absence() {
        // Given
        let mut context = RabbitMqContext::new(DispatchContext::with_message_id("m-2"));

        // When
        context.set_priority(0);

        // Then
        assert_eq!(context.priority(), Some(0));
    }
}
