use crate::adapter::{TransportAdapter, TransportType};
use parking_lot::RwLock;
use shunt_core::{CaselessMap, DispatchError, PropertyMap};
use std::sync::Arc;
use tracing::{debug, info};

/// One registered transport: the adapter plus its registration detail.
#[derive(Clone)]
pub struct TransportRegistration {
    name: String,
    adapter: Arc<dyn TransportAdapter>,
    transport_type: TransportType,
    options: PropertyMap,
}

impl TransportRegistration {
    /// Reports the name this transport was registered under, with its
    /// original casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposes the registered adapter.
    pub fn adapter(&self) -> &Arc<dyn TransportAdapter> {
        &self.adapter
    }

    /// Reports the substrate of the registered adapter.
    pub fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    /// Exposes the registration options.
    pub fn options(&self) -> &PropertyMap {
        &self.options
    }
}

impl std::fmt::Debug for TransportRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistration")
            .field("name", &self.name)
            .field("transport_type", &self.transport_type)
            .finish()
    }
}

/// The named registry of transport adapters, with a single designated
/// default.
///
/// Names compare case-insensitively but are stored (and reported) as
/// provided. The registry owns its adapter instances: whoever clears the
/// registry is responsible for having stopped them first (the
/// [`MultiTransportAdapter`](crate::MultiTransportAdapter) dispose path does
/// exactly that).
pub struct TransportRegistry {
    inner: RwLock<Inner>,
}

struct Inner {
    registrations: CaselessMap<TransportRegistration>,
    default_name: Option<String>,
}

impl TransportRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                registrations: CaselessMap::new(),
                default_name: None,
            }),
        }
    }

    /// Registers an adapter under the given name.
    ///
    /// Fails with [`Duplicate`](shunt_core::ErrorKind::Duplicate) when a
    /// transport with a matching name (case-insensitively) is already
    /// registered, and with
    /// [`InvalidArgument`](shunt_core::ErrorKind::InvalidArgument) when the
    /// name is empty.
    pub fn register_transport(
        &self,
        name: &str,
        adapter: Arc<dyn TransportAdapter>,
        transport_type: TransportType,
        options: PropertyMap,
    ) -> Result<(), DispatchError> {
        if name.trim().is_empty() {
            return Err(DispatchError::invalid_argument(
                "transport name must not be empty",
            ));
        }

        let mut inner = self.inner.write();

        if inner.registrations.contains(name) {
            return Err(DispatchError::duplicate(format!(
                "transport '{}' is already registered",
                name,
            )));
        }

        inner.registrations.insert(
            name,
            TransportRegistration {
                name: name.to_owned(),
                adapter,
                transport_type,
                options,
            },
        );

        info!(transport = name, %transport_type, "Registered transport");

        Ok(())
    }

    /// Removes the transport with the given name, returning its
    /// registration. Removing the default transport also unsets the
    /// default.
    pub fn remove_transport(&self, name: &str) -> Option<TransportRegistration> {
        let mut inner = self.inner.write();

        let removed = inner.registrations.remove(name);

        if removed.is_some() {
            let was_default = inner
                .default_name
                .as_deref()
                .is_some_and(|default| default.eq_ignore_ascii_case(name));

            if was_default {
                inner.default_name = None;
            }

            debug!(transport = name, "Removed transport");
        }

        removed
    }

    /// Designates the transport with the given name as the default.
    ///
    /// Fails with [`NotFound`](shunt_core::ErrorKind::NotFound) when no such
    /// transport is registered.
    pub fn set_default_transport(&self, name: &str) -> Result<(), DispatchError> {
        let mut inner = self.inner.write();

        if !inner.registrations.contains(name) {
            return Err(DispatchError::not_found(format!(
                "cannot set default transport: '{}' is not registered",
                name,
            )));
        }

        inner.default_name = Some(name.to_owned());

        info!(transport = name, "Designated default transport");

        Ok(())
    }

    /// Reports whether a default transport is designated.
    pub fn has_default_transport(&self) -> bool {
        self.inner.read().default_name.is_some()
    }

    /// Reports the name of the default transport, if designated.
    pub fn default_transport_name(&self) -> Option<String> {
        self.inner.read().default_name.clone()
    }

    /// Returns the adapter of the default transport, or `None`.
    pub fn default_transport_adapter(&self) -> Option<Arc<dyn TransportAdapter>> {
        self.default_transport_registration()
            .map(|registration| Arc::clone(registration.adapter()))
    }

    /// Returns the full registration of the default transport, or `None`.
    pub fn default_transport_registration(&self) -> Option<TransportRegistration> {
        let inner = self.inner.read();

        inner
            .default_name
            .as_deref()
            .and_then(|name| inner.registrations.get(name))
            .cloned()
    }

    /// Returns the adapter registered under the given name, or `None`.
    pub fn get_transport_adapter(&self, name: &str) -> Option<Arc<dyn TransportAdapter>> {
        self.inner
            .read()
            .registrations
            .get(name)
            .map(|registration| Arc::clone(registration.adapter()))
    }

    /// Returns the full registration under the given name, or `None`.
    pub fn get_transport_registration(&self, name: &str) -> Option<TransportRegistration> {
        self.inner.read().registrations.get(name).cloned()
    }

    /// Reports the registered names, in registration order and original
    /// casing.
    pub fn transport_names(&self) -> Vec<String> {
        self.inner
            .read()
            .registrations
            .names()
            .map(str::to_owned)
            .collect()
    }

    /// Returns every registration, in registration order.
    pub fn all_transports(&self) -> Vec<TransportRegistration> {
        self.inner
            .read()
            .registrations
            .iter()
            .map(|(_, registration)| registration.clone())
            .collect()
    }

    /// Reports the number of registered transports.
    pub fn len(&self) -> usize {
        self.inner.read().registrations.len()
    }

    /// Reports whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().registrations.is_empty()
    }

    /// Drops every registration and the default designation. The caller is
    /// expected to have stopped the adapters.
    pub fn clear(&self) {
        let mut inner = self.inner.write();

        inner.registrations.clear();
        inner.default_name = None;
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTransport;
    use pretty_assertions::assert_eq;
    use shunt_core::ErrorKind;

    fn make_adapter(name: &str) -> Arc<dyn TransportAdapter> {
        Arc::new(InMemoryTransport::new(name))
    }

    fn register(registry: &TransportRegistry, name: &str) {
        registry
            .register_transport(
                name,
                make_adapter(name),
                TransportType::InMemory,
                PropertyMap::new(),
            )
            .unwrap();
    }

    #[test]
    fn register_and_remove_round_trip() {
        // Given
        let registry = TransportRegistry::new();

        // When
        register(&registry, "rabbit");
        let removed = registry.remove_transport("rabbit");

        // Then: back to the original state
        assert!(removed.is_some());
        assert!(registry.is_empty());
        assert!(registry.get_transport_adapter("rabbit").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        // Given
        let registry = TransportRegistry::new();
        register(&registry, "Rabbit");

        // When
        let error = registry
            .register_transport(
                "rabbit",
                make_adapter("rabbit"),
                TransportType::InMemory,
                PropertyMap::new(),
            )
            .unwrap_err();

        // Then: rejected, and the original casing is preserved
        assert_eq!(error.kind(), ErrorKind::Duplicate);
        assert_eq!(registry.transport_names(), vec!["Rabbit"]);
    }

    #[test]
    fn empty_names_are_rejected() {
        // Given
        let registry = TransportRegistry::new();

        // When
        let error = registry
            .register_transport(
                "  ",
                make_adapter("x"),
                TransportType::InMemory,
                PropertyMap::new(),
            )
            .unwrap_err();

        // Then
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn default_transport_requires_registration() {
        // Given
        let registry = TransportRegistry::new();

        // When
        let error = registry.set_default_transport("ghost").unwrap_err();

        // Then
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(!registry.has_default_transport());
    }

    #[test]
    fn default_transport_reflects_once_set() {
        // Given
        let registry = TransportRegistry::new();
        register(&registry, "rabbit");
        register(&registry, "kafka");

        // When
        registry.set_default_transport("rabbit").unwrap();

        // Then
        assert!(registry.has_default_transport());
        assert_eq!(registry.default_transport_name(), Some("rabbit".to_owned()));
        assert_eq!(
            registry
                .default_transport_registration()
                .unwrap()
                .transport_type(),
            TransportType::InMemory,
        );
        assert!(registry.default_transport_adapter().is_some());
    }

    #[test]
    fn removing_the_default_unsets_it() {
        // Given
        let registry = TransportRegistry::new();
        register(&registry, "rabbit");
        registry.set_default_transport("rabbit").unwrap();

        // When
        registry.remove_transport("RABBIT");

        // Then
        assert!(!registry.has_default_transport());
    }

    #[test]
    fn lookup_ignores_case() {
        // Given
        let registry = TransportRegistry::new();
        register(&registry, "Rabbit");

        // Then
        assert!(registry.get_transport_adapter("RABBIT").is_some());
        assert!(registry.get_transport_registration("rabbit").is_some());
    }

    #[test]
    fn clear_empties_everything() {
        // Given
        let registry = TransportRegistry::new();
        register(&registry, "rabbit");
        registry.set_default_transport("rabbit").unwrap();

        // When
        registry.clear();

        // Then
        assert!(registry.is_empty());
        assert!(!registry.has_default_transport());
    }
}
