use crate::caseless::CaselessMap;
use crate::error::DispatchError;

/// The well-known header names recognized across transports.
///
/// Header names are case-preserving on the wire and case-insensitive on
/// lookup; these constants carry the canonical casing.
pub mod headers {
    /// Logical trace across dispatches.
    pub const CORRELATION_ID: &str = "X-Correlation-Id";
    /// Immediate parent dispatch.
    pub const CAUSATION_ID: &str = "X-Causation-Id";
    /// Optimistic concurrency tag, opaque to the runtime.
    pub const ETAG: &str = "X-Etag";
    /// Tenant scoping, opaque to the runtime.
    pub const TENANT_ID: &str = "X-Tenant-Id";
    /// Originator principal, opaque to the runtime.
    pub const RAISED_BY: &str = "X-Raised-By";
    /// Full or short message type name, consulted by the typed mapper.
    pub const MESSAGE_TYPE: &str = "X-Message-Type";

    /// Cross-transport carrier for a source priority that has no natural
    /// slot on the target transport.
    pub const PRIORITY: &str = "x-priority";
    /// Cross-transport carrier for a source expiration.
    pub const EXPIRATION: &str = "x-expiration";
    /// Cross-transport carrier for a source reply-to address.
    pub const REPLY_TO: &str = "x-reply-to";
}

/// An ordered mapping of header name to optional string value.
///
/// Names compare case-insensitively while preserving their original casing;
/// values may be absent (a header explicitly set to nothing is distinct from
/// a header never set). Iteration yields headers in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    inner: CaselessMap<Option<String>>,
}

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self {
            inner: CaselessMap::new(),
        }
    }

    /// Sets the header with the given name to the given value, replacing any
    /// previous value. Absent (`None`) values are accepted.
    ///
    /// Fails with [`InvalidArgument`](crate::ErrorKind::InvalidArgument) when
    /// the name is empty or blank.
    pub fn set(
        &mut self,
        name: &str,
        value: Option<impl Into<String>>,
    ) -> Result<(), DispatchError> {
        if name.trim().is_empty() {
            return Err(DispatchError::invalid_argument(
                "header name must not be empty",
            ));
        }

        self.inner.insert(name, value.map(Into::into));

        Ok(())
    }

    /// Returns the value of the header with the given name, if the header is
    /// present and carries a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|value| value.as_deref())
    }

    /// Returns the value slot of the header with the given name: `None` when
    /// the header is absent, `Some(None)` when it is present without a value.
    pub fn lookup(&self, name: &str) -> Option<Option<&str>> {
        self.inner.get(name).map(|value| value.as_deref())
    }

    /// Reports whether a header with the given name is present, with or
    /// without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    /// Removes the header with the given name, reporting whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Reports the number of headers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Reports whether the map holds no headers.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.inner.iter().map(|(name, value)| (name, value.as_deref()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(name, value)| (name, Some(value.into())))
                .collect(),
        }
    }
}
