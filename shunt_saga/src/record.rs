use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// The lifecycle state of an indexed saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaStatus {
    /// Actively progressing.
    Running,
    /// Parked, waiting on an external condition.
    Suspended,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

impl Display for SagaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SagaStatus::Running => "running",
            SagaStatus::Suspended => "suspended",
            SagaStatus::Completed => "completed",
            SagaStatus::Failed => "failed",
        };

        f.write_str(name)
    }
}

/// One indexed saga.
#[derive(Debug, Clone, PartialEq)]
pub struct SagaRecord {
    saga_id: String,
    saga_type: String,
    correlation_id: String,
    status: SagaStatus,
    created_at: SystemTime,
    properties: HashMap<String, String>,
}

impl SagaRecord {
    /// Creates a record for the given saga.
    pub fn new(
        saga_id: impl Into<String>,
        saga_type: impl Into<String>,
        correlation_id: impl Into<String>,
        status: SagaStatus,
        created_at: SystemTime,
    ) -> Self {
        Self {
            saga_id: saga_id.into(),
            saga_type: saga_type.into(),
            correlation_id: correlation_id.into(),
            status,
            created_at,
            properties: HashMap::new(),
        }
    }

    /// Reports the saga ID.
    pub fn saga_id(&self) -> &str {
        &self.saga_id
    }

    /// Reports the saga type name.
    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Reports the correlation ID.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Reports the lifecycle state.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Reports when the saga was first indexed.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Exposes the indexed property values of this saga.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub(crate) fn set_status(&mut self, status: SagaStatus) {
        self.status = status;
    }

    pub(crate) fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }
}
