use shunt_core::DispatchContext;
use std::ops::{Deref, DerefMut};

/// The stable transport-property names of the gRPC context.
pub mod keys {
    /// The fully-qualified method to invoke.
    pub const METHOD: &str = "grpc.method";
    /// The authority (host) to address.
    pub const AUTHORITY: &str = "grpc.authority";
}

/// A [`DispatchContext`] specialized for gRPC.
#[derive(Debug, Clone)]
pub struct GrpcContext {
    inner: DispatchContext,
}

impl GrpcContext {
    /// Wraps the given context.
    pub fn new(inner: DispatchContext) -> Self {
        Self { inner }
    }

    /// Unwraps back into the plain context.
    pub fn into_inner(self) -> DispatchContext {
        self.inner
    }

    /// Reports the method to invoke, if set.
    pub fn method(&self) -> Option<String> {
        self.inner.transport_property(keys::METHOD)
    }

    /// Sets the method to invoke.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.inner.set_transport_property(keys::METHOD, method.into());
    }

    /// Reports the authority, if set.
    pub fn authority(&self) -> Option<String> {
        self.inner.transport_property(keys::AUTHORITY)
    }

    /// Sets the authority.
    pub fn set_authority(&mut self, authority: impl Into<String>) {
        self.inner
            .set_transport_property(keys::AUTHORITY, authority.into());
    }
}

impl Deref for GrpcContext {
    type Target = DispatchContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for GrpcContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<DispatchContext> for GrpcContext {
    fn from(inner: DispatchContext) -> Self {
        Self::new(inner)
    }
}
