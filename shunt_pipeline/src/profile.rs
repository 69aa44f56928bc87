use serde::Deserialize;
use shunt_core::MessageKind;

/// The well-known name of the strict profile.
pub const PROFILE_STRICT: &str = "Strict";

/// The well-known name of the internal-event profile.
pub const PROFILE_INTERNAL_EVENT: &str = "InternalEvent";

/// A named middleware line-up for a class of messages.
///
/// A profile is configuration, not machinery: it records which middleware
/// types run (in order), whether the pipeline is strict about them, and
/// which message kinds the profile serves. Assembly code resolves the type
/// names against the registered middlewares when wiring a dispatcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineProfile {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    middleware_types: Vec<String>,
    #[serde(default)]
    is_strict: bool,
    #[serde(default = "all_kinds")]
    supported_kinds: MessageKind,
}

fn all_kinds() -> MessageKind {
    MessageKind::ALL
}

impl PipelineProfile {
    /// Creates a profile with the given contents.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        middleware_types: Vec<String>,
        is_strict: bool,
        supported_kinds: MessageKind,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            middleware_types,
            is_strict,
            supported_kinds,
        }
    }

    /// The well-known strict profile: the full middleware line-up, strict
    /// mode, actions only.
    pub fn strict(middleware_types: Vec<String>) -> Self {
        Self::new(
            PROFILE_STRICT,
            "Full middleware line-up for actions",
            middleware_types,
            true,
            MessageKind::ACTION,
        )
    }

    /// The well-known internal-event profile: no middlewares, events only.
    pub fn internal_event() -> Self {
        Self::new(
            PROFILE_INTERNAL_EVENT,
            "Bare pipeline for in-process events",
            Vec::new(),
            false,
            MessageKind::EVENT,
        )
    }

    /// Reports the profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports the profile description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Reports the ordered middleware type names of this profile.
    pub fn middleware_types(&self) -> &[String] {
        &self.middleware_types
    }

    /// Reports whether the pipeline is strict about this line-up.
    pub fn is_strict(&self) -> bool {
        self.is_strict
    }

    /// Reports the message kinds this profile serves.
    pub fn supported_kinds(&self) -> MessageKind {
        self.supported_kinds
    }

    /// Reports whether this profile serves the given kind.
    pub fn supports(&self, kind: MessageKind) -> bool {
        self.supported_kinds.intersects(kind)
    }
}
