use crate::config::SagaIndexConfig;
use crate::record::{SagaRecord, SagaStatus};
use dashmap::DashMap;
use std::time::SystemTime;
use tracing::trace;

/// The in-memory secondary index over saga state.
///
/// The primary map holds one [`SagaRecord`] per saga ID. Two secondary
/// indexes answer the lookup queries: by correlation ID, and by
/// `(property name, property value)` with multi-value support — several
/// sagas may share one property value.
///
/// Queries filter out [`Completed`](SagaStatus::Completed) sagas unless the
/// configuration says otherwise, and cap their result lists at the
/// configured maximum. Results come back in indexing order.
pub struct CorrelationIndex {
    config: SagaIndexConfig,
    records: DashMap<String, SagaRecord>,
    by_correlation: DashMap<String, Vec<String>>,
    by_property: DashMap<(String, String), Vec<String>>,
}

impl CorrelationIndex {
    /// Creates an index with the given configuration.
    pub fn new(config: impl AsRef<SagaIndexConfig>) -> Self {
        Self {
            config: config.as_ref().clone(),
            records: DashMap::new(),
            by_correlation: DashMap::new(),
            by_property: DashMap::new(),
        }
    }

    /// Upserts the primary record for the given saga.
    ///
    /// A repeated call for the same saga ID replaces the record (keeping its
    /// indexed properties) and re-homes the correlation entry when the
    /// correlation ID changed.
    pub fn index_saga(
        &self,
        saga_id: &str,
        saga_type: &str,
        correlation_id: &str,
        status: SagaStatus,
        created_at: SystemTime,
    ) {
        let mut record = SagaRecord::new(saga_id, saga_type, correlation_id, status, created_at);

        if let Some(previous) = self.records.get(saga_id) {
            // Keep previously indexed properties across the upsert
            for (name, value) in previous.properties() {
                record.set_property(name, value);
            }

            if previous.correlation_id() != correlation_id {
                self.unlink_correlation(previous.correlation_id(), saga_id);
            }
        }

        self.records.insert(saga_id.to_owned(), record);

        let mut linked = self
            .by_correlation
            .entry(correlation_id.to_owned())
            .or_default();
        if !linked.iter().any(|existing| existing == saga_id) {
            linked.push(saga_id.to_owned());
        }

        trace!(saga_id, correlation_id, %status, "Indexed saga");
    }

    /// Appends the given property value to the property index and records it
    /// on the saga.
    pub fn index_property(&self, saga_id: &str, name: &str, value: &str) {
        if let Some(mut record) = self.records.get_mut(saga_id) {
            record.set_property(name, value);
        }

        let mut linked = self
            .by_property
            .entry((name.to_owned(), value.to_owned()))
            .or_default();
        if !linked.iter().any(|existing| existing == saga_id) {
            linked.push(saga_id.to_owned());
        }
    }

    /// Mutates the status of an existing record. Unknown saga IDs are
    /// silently ignored.
    pub fn update_status(&self, saga_id: &str, status: SagaStatus) {
        if let Some(mut record) = self.records.get_mut(saga_id) {
            record.set_status(status);
        }
    }

    /// Returns the sagas indexed under the given correlation ID, subject to
    /// the completed-filter and the result cap.
    pub fn find_by_correlation_id(&self, correlation_id: &str) -> Vec<SagaRecord> {
        match self.by_correlation.get(correlation_id) {
            Some(linked) => self.collect(&linked),
            None => Vec::new(),
        }
    }

    /// Returns the sagas indexed under the given property value, subject to
    /// the completed-filter and the result cap.
    pub fn find_by_property(&self, name: &str, value: &str) -> Vec<SagaRecord> {
        match self
            .by_property
            .get(&(name.to_owned(), value.to_owned()))
        {
            Some(linked) => self.collect(&linked),
            None => Vec::new(),
        }
    }

    /// Removes the given saga from the primary map and every secondary
    /// index.
    pub fn remove(&self, saga_id: &str) {
        let Some((_, record)) = self.records.remove(saga_id) else {
            return;
        };

        self.unlink_correlation(record.correlation_id(), saga_id);

        for (name, value) in record.properties() {
            let key = (name.clone(), value.clone());
            let emptied = match self.by_property.get_mut(&key) {
                Some(mut linked) => {
                    linked.retain(|existing| existing != saga_id);
                    linked.is_empty()
                }
                None => false,
            };

            if emptied {
                self.by_property.remove(&key);
            }
        }
    }

    /// Reports the number of indexed sagas.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Empties every data structure of this index.
    pub fn clear(&self) {
        self.records.clear();
        self.by_correlation.clear();
        self.by_property.clear();
    }

    /// Resolves a list of saga IDs into filtered, capped records.
    fn collect(&self, saga_ids: &[String]) -> Vec<SagaRecord> {
        saga_ids
            .iter()
            .filter_map(|saga_id| self.records.get(saga_id))
            .filter(|record| {
                self.config.include_completed || record.status() != SagaStatus::Completed
            })
            .take(self.config.max_results)
            .map(|record| record.clone())
            .collect()
    }

    fn unlink_correlation(&self, correlation_id: &str, saga_id: &str) {
        let emptied = match self.by_correlation.get_mut(correlation_id) {
            Some(mut linked) => {
                linked.retain(|existing| existing != saga_id);
                linked.is_empty()
            }
            None => false,
        };

        if emptied {
            self.by_correlation.remove(correlation_id);
        }
    }
}

impl Default for CorrelationIndex {
    fn default() -> Self {
        Self::new(SagaIndexConfig::default())
    }
}
