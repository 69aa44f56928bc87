use crate::registry::TransportRegistry;
use serde::Deserialize;
use shunt_core::DispatchError;

/// The policy checked by the [`StartupValidator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ValidationConfig {
    /// Whether at least one transport must be registered before dispatching
    /// starts.
    pub require_at_least_one_transport: bool,
    /// Whether a default transport must be designated whenever two or more
    /// transports are registered.
    pub require_default_when_multiple: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_at_least_one_transport: true,
            require_default_when_multiple: true,
        }
    }
}

impl AsRef<ValidationConfig> for ValidationConfig {
    fn as_ref(&self) -> &ValidationConfig {
        self
    }
}

/// Fails fast, before any dispatch, when the transport configuration is
/// unusable.
///
/// The no-transports check runs before the no-default check, so the first
/// error an operator sees is the one with the more actionable remedy.
pub struct StartupValidator {
    config: ValidationConfig,
}

impl StartupValidator {
    /// Creates a validator with the given policy.
    pub fn new(config: impl AsRef<ValidationConfig>) -> Self {
        Self {
            config: config.as_ref().clone(),
        }
    }

    /// Validates the given registry against the policy, failing with a
    /// [`ConfigurationError`](shunt_core::ErrorKind::ConfigurationError)
    /// that names the remedial call.
    pub fn validate(&self, registry: &TransportRegistry) -> Result<(), DispatchError> {
        // The "nothing registered" message is the more actionable one; it
        // must win over the missing-default complaint
        if self.config.require_at_least_one_transport && registry.is_empty() {
            return Err(DispatchError::configuration(
                "no transports are registered; register at least one before starting, \
                 e.g. register_transport(\"rabbit\", ...) or add a broker-specific \
                 helper such as add_rabbitmq_transport(...)",
            ));
        }

        if self.config.require_default_when_multiple
            && registry.len() >= 2
            && !registry.has_default_transport()
        {
            let names = registry.transport_names().join("', '");

            return Err(DispatchError::configuration(format!(
                "multiple transports are registered ('{}') but none is designated as \
                 the default; call set_default_transport(name) with one of them",
                names,
            )));
        }

        Ok(())
    }
}
