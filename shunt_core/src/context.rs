use crate::header::HeaderMap;
use crate::value::{FromPropertyValue, IntoPropertyValue, PropertyMap};
use std::time::SystemTime;
use uuid::Uuid;

/// The per-dispatch carrier of message identity, correlation, headers, and
/// transport properties.
///
/// One context accompanies one in-flight dispatch from the transport edge
/// through the middleware chain to the final handler. The context is owned by
/// that single dispatch; it is never shared between concurrent dispatches,
/// which is why its accessors take `&mut self` without further
/// synchronization.
///
/// Three mutable surfaces ride on the context:
///
/// - [`headers`](DispatchContext::headers): the wire-visible header block;
/// - [`properties`](DispatchContext::properties): out-of-band values threaded
///   between middlewares without touching the message;
/// - [`transport_properties`](DispatchContext::transport_properties): values
///   of transport origin (routing key, topic, partition, and the like),
///   stored under stable names so that cross-transport mappers can read them
///   generically.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    message_id: String,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    source_transport: Option<String>,
    target_transport: Option<String>,
    content_type: Option<String>,
    timestamp: SystemTime,
    headers: HeaderMap,
    properties: PropertyMap,
    transport_properties: PropertyMap,
}

impl DispatchContext {
    /// Creates a context with a freshly generated message ID (a 128-bit
    /// random value rendered compactly).
    pub fn new() -> Self {
        Self::with_message_id(Uuid::new_v4().simple().to_string())
    }

    /// Creates a context for a message that already carries an ID.
    pub fn with_message_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            correlation_id: None,
            causation_id: None,
            source_transport: None,
            target_transport: None,
            content_type: None,
            timestamp: SystemTime::now(),
            headers: HeaderMap::new(),
            properties: PropertyMap::new(),
            transport_properties: PropertyMap::new(),
        }
    }

    /// Reports the message ID.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Reports the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Sets the correlation ID.
    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
    }

    /// Reports the causation ID, if set.
    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    /// Sets the causation ID.
    pub fn set_causation_id(&mut self, causation_id: impl Into<String>) {
        self.causation_id = Some(causation_id.into());
    }

    /// Reports the name of the transport this message arrived on, if any.
    pub fn source_transport(&self) -> Option<&str> {
        self.source_transport.as_deref()
    }

    /// Records the name of the transport this message arrived on.
    pub fn set_source_transport(&mut self, transport: impl Into<String>) {
        self.source_transport = Some(transport.into());
    }

    /// Reports the name of the transport this message is destined for, if
    /// any.
    pub fn target_transport(&self) -> Option<&str> {
        self.target_transport.as_deref()
    }

    /// Records the name of the transport this message is destined for.
    pub fn set_target_transport(&mut self, transport: impl Into<String>) {
        self.target_transport = Some(transport.into());
    }

    /// Reports the content type of the payload, if known.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Sets the content type of the payload.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Reports the timestamp of this dispatch.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Overrides the timestamp of this dispatch. Mappers use this to carry
    /// the original timestamp across transports.
    pub fn set_timestamp(&mut self, timestamp: SystemTime) {
        self.timestamp = timestamp;
    }

    /// Exposes the header block.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Exposes the header block mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Exposes the out-of-band property bag threaded between middlewares.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Exposes the out-of-band property bag mutably.
    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    /// Exposes the transport-property bag.
    pub fn transport_properties(&self) -> &PropertyMap {
        &self.transport_properties
    }

    /// Exposes the transport-property bag mutably.
    pub fn transport_properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.transport_properties
    }

    /// Stores a transport property under the given name.
    pub fn set_transport_property(&mut self, name: impl Into<String>, value: impl IntoPropertyValue) {
        self.transport_properties.set(name, value);
    }

    /// Extracts a transport property into the requested type. Absent names
    /// and mismatched shapes both yield `None`.
    pub fn transport_property<R: FromPropertyValue>(&self, name: &str) -> Option<R> {
        self.transport_properties.get(name)
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}
