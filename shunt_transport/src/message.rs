use shunt_core::{
    DispatchContext, Dispatchable, HeaderMap, IntoPropertyValue, MessageKind, PropertyMap,
    headers, kind_of_type_name,
};

/// A message as a transport substrate carries it: an opaque payload plus
/// wire-visible metadata.
///
/// The runtime never interprets the payload — serialization is the embedding
/// application's business, and the content type rides through untouched. The
/// declared type name (mirrored in the
/// [`X-Message-Type`](shunt_core::headers::MESSAGE_TYPE) header) is what the
/// dispatch edge derives the message kind from, by the usual suffix
/// convention.
///
/// ## Example
///
/// ```
/// use shunt_transport::TransportMessage;
///
/// let message = TransportMessage::new(br#"{"order_id": 17}"#.to_vec())
///     .with_type_name("orders.OrderPlacedEvent")
///     .with_content_type("application/json")
///     .with_header("X-Tenant-Id", "acme");
/// # drop(message);
/// ```
#[derive(Debug, Clone)]
pub struct TransportMessage {
    message_id: Option<String>,
    type_name: Option<String>,
    payload: Vec<u8>,
    headers: HeaderMap,
    properties: PropertyMap,
    content_type: Option<String>,
}

impl TransportMessage {
    /// Creates a message with the given payload bytes.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            message_id: None,
            type_name: None,
            payload,
            headers: HeaderMap::new(),
            properties: PropertyMap::new(),
            content_type: None,
        }
    }

    /// Sets the message ID carried on the wire.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());

        self
    }

    /// Declares the message type, mirroring it into the
    /// [`X-Message-Type`](shunt_core::headers::MESSAGE_TYPE) header.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();

        // The header mirrors the declared type for cross-transport readers;
        // the header name is never empty, so this cannot fail
        let _ = self
            .headers
            .set(headers::MESSAGE_TYPE, Some(type_name.clone()));
        self.type_name = Some(type_name);

        self
    }

    /// Sets a wire header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let _ = self.headers.set(name, Some(value.into()));

        self
    }

    /// Sets a transport property (a send option of the carrying substrate:
    /// routing key, topic, partition, and the like).
    pub fn with_property(mut self, name: impl Into<String>, value: impl IntoPropertyValue) -> Self {
        self.properties.set(name, value);

        self
    }

    /// Sets the content type of the payload.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());

        self
    }

    /// Reports the message ID, if one was carried.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Reports the declared type name, if one was carried.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Exposes the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Exposes the wire headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Exposes the wire headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Exposes the transport properties.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Exposes the transport properties mutably.
    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    /// Reports the content type, if one was carried.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Builds the per-dispatch context for this message arriving on the
    /// named transport: identity and correlation lift out of the well-known
    /// headers, everything else copies across.
    pub fn build_context(&self, source_transport: &str) -> DispatchContext {
        let mut context = match &self.message_id {
            Some(message_id) => DispatchContext::with_message_id(message_id.clone()),
            None => DispatchContext::new(),
        };

        context.set_source_transport(source_transport);

        if let Some(correlation_id) = self.headers.get(headers::CORRELATION_ID) {
            context.set_correlation_id(correlation_id);
        }
        if let Some(causation_id) = self.headers.get(headers::CAUSATION_ID) {
            context.set_causation_id(causation_id);
        }
        if let Some(content_type) = &self.content_type {
            context.set_content_type(content_type.clone());
        }

        for (name, value) in self.headers.iter() {
            // The header name came off a live header map, never empty
            let _ = context.headers_mut().set(name, value);
        }

        context.transport_properties_mut().merge_from(&self.properties);

        context
    }
}

impl Dispatchable for TransportMessage {
    /// Derives the kind from the declared type name's suffix; an undeclared
    /// type defaults to an action.
    fn kind(&self) -> MessageKind {
        match &self.type_name {
            Some(type_name) => kind_of_type_name(type_name),
            None => MessageKind::ACTION,
        }
    }
}
