use crate::config::InboxConfig;
use crate::entry::{InboxEntry, InboxKey, InboxStatistics, InboxStatus};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shunt_core::DispatchError;
use shunt_sync::Spindown;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::select;
use tracing::{debug, info, trace};

/// The once-only inbound processing store.
///
/// Entries are keyed by `(message id, handler key)`. Insertion is atomic per
/// key: of any number of concurrent inserts of the same key, exactly one
/// wins and the rest fail with
/// [`Duplicate`](shunt_core::ErrorKind::Duplicate) — which under load is a
/// normal-path outcome, not an anomaly. State transitions are serialized per
/// entry; readers never block writers of other entries.
///
/// ## Background tasks
///
/// When [`max_entries`](InboxConfig::max_entries) is set, an insertion that
/// pushes the store over the cap schedules an asynchronous trim of the
/// oldest entries; the cap is soft and observers may transiently see more
/// entries. When [`auto_cleanup`](InboxConfig::auto_cleanup) is enabled, a
/// periodic ticker runs [`cleanup`](InboxStore::cleanup) with the configured
/// retention. Both tasks register with the store's spindown supervisor and
/// halt promptly on [`dispose`](InboxStore::dispose).
pub struct InboxStore {
    entries: DashMap<InboxKey, InboxEntry>,
    config: InboxConfig,
    spindown: Spindown,
    trim_in_flight: AtomicBool,
    disposed: AtomicBool,
}

impl InboxStore {
    /// Creates a store with the given configuration, spawning the periodic
    /// cleanup task when enabled. Must be called within a Tokio runtime.
    pub fn new(config: impl AsRef<InboxConfig>) -> Arc<Self> {
        let config = config.as_ref().clone();
        let auto_cleanup = config.auto_cleanup;

        let store = Arc::new(Self {
            entries: DashMap::new(),
            config,
            spindown: Spindown::new(),
            trim_in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });

        if auto_cleanup {
            Self::spawn_auto_cleanup(&store);
        }

        store
    }

    /// Records a new entry for the given message and handler.
    ///
    /// Fails with [`Duplicate`](shunt_core::ErrorKind::Duplicate) when an
    /// entry with the same `(message id, handler key)` already exists, and
    /// with [`InvalidArgument`](shunt_core::ErrorKind::InvalidArgument) when
    /// either key part is empty.
    pub fn create_entry(
        self: &Arc<Self>,
        message_id: &str,
        handler_key: &str,
        message_type: &str,
        payload: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<(), DispatchError> {
        self.ensure_live()?;

        if message_id.is_empty() {
            return Err(DispatchError::invalid_argument(
                "message ID must not be empty",
            ));
        }
        if handler_key.is_empty() {
            return Err(DispatchError::invalid_argument(
                "handler key must not be empty",
            ));
        }

        let key = InboxKey::new(message_id, handler_key);

        match self.entries.entry(key) {
            Entry::Occupied(_) => {
                trace!(
                    message_id,
                    handler_key,
                    "Duplicate inbound message suppressed",
                );

                return Err(DispatchError::duplicate(format!(
                    "inbox entry for message '{}' and handler '{}' already exists",
                    message_id, handler_key,
                )));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(InboxEntry::new(
                    InboxKey::new(message_id, handler_key),
                    message_type,
                    payload,
                    metadata,
                ));

                debug!(message_id, handler_key, "Recorded inbound message");
            }
        }

        self.maybe_schedule_trim();

        Ok(())
    }

    /// Transitions the entry for the given key from
    /// [`Pending`](InboxStatus::Pending) to
    /// [`Processed`](InboxStatus::Processed).
    ///
    /// Fails with [`NotFound`](shunt_core::ErrorKind::NotFound) when no such
    /// entry exists, and with
    /// [`InvalidTransition`](shunt_core::ErrorKind::InvalidTransition) when
    /// the entry is not pending (a second call on a processed entry leaves
    /// its status untouched).
    pub fn mark_processed(&self, message_id: &str, handler_key: &str) -> Result<(), DispatchError> {
        self.ensure_live()?;

        let key = InboxKey::new(message_id, handler_key);

        match self.entries.get_mut(&key) {
            None => Err(Self::missing(message_id, handler_key)),
            Some(mut entry) => {
                if entry.status() != InboxStatus::Pending {
                    return Err(DispatchError::invalid_transition(format!(
                        "inbox entry for message '{}' and handler '{}' is already {}",
                        message_id,
                        handler_key,
                        entry.status(),
                    )));
                }

                entry.transition(InboxStatus::Processed, None);

                Ok(())
            }
        }
    }

    /// Transitions the entry for the given key to
    /// [`Failed`](InboxStatus::Failed), from any state — including a
    /// previously processed entry, which this overrides.
    ///
    /// Fails with [`NotFound`](shunt_core::ErrorKind::NotFound) when no such
    /// entry exists.
    pub fn mark_failed(
        &self,
        message_id: &str,
        handler_key: &str,
        reason: &str,
    ) -> Result<(), DispatchError> {
        self.ensure_live()?;

        let key = InboxKey::new(message_id, handler_key);

        match self.entries.get_mut(&key) {
            None => Err(Self::missing(message_id, handler_key)),
            Some(mut entry) => {
                entry.transition(InboxStatus::Failed, Some(reason.to_owned()));

                Ok(())
            }
        }
    }

    /// Returns a copy of the entry for the given key, or `None`.
    pub fn get_entry(
        &self,
        message_id: &str,
        handler_key: &str,
    ) -> Result<Option<InboxEntry>, DispatchError> {
        self.ensure_live()?;

        let key = InboxKey::new(message_id, handler_key);

        Ok(self.entries.get(&key).map(|entry| entry.clone()))
    }

    /// Returns a snapshot of all entries. Readers do not block concurrent
    /// mutation of unrelated entries.
    pub fn get_all_entries(&self) -> Result<Vec<InboxEntry>, DispatchError> {
        self.ensure_live()?;

        Ok(self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    /// Computes a census of the store. Each counted entry contributes
    /// exactly one status, so the snapshot is internally consistent.
    pub fn statistics(&self) -> Result<InboxStatistics, DispatchError> {
        self.ensure_live()?;

        let now = SystemTime::now();
        let mut statistics = InboxStatistics::default();
        let mut oldest_pending: Option<SystemTime> = None;

        for entry in self.entries.iter() {
            statistics.total += 1;

            match entry.status() {
                InboxStatus::Pending => {
                    statistics.pending += 1;

                    let created_at = entry.created_at();
                    if oldest_pending.is_none_or(|oldest| created_at < oldest) {
                        oldest_pending = Some(created_at);
                    }
                }
                InboxStatus::Processed => statistics.processed += 1,
                InboxStatus::Failed => statistics.failed += 1,
            }
        }

        statistics.oldest_pending_age =
            oldest_pending.and_then(|oldest| now.duration_since(oldest).ok());

        Ok(statistics)
    }

    /// Removes finished (processed or failed) entries whose last state
    /// change is older than the given retention, returning the count
    /// removed. Pending entries always survive. Concurrent cleanups are
    /// safe; each eligible entry is removed (and counted) exactly once.
    pub fn cleanup(&self, retention: Duration) -> Result<usize, DispatchError> {
        self.ensure_live()?;

        let cutoff = SystemTime::now().checked_sub(retention);
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };

        let mut removed = 0usize;

        self.entries.retain(|_, entry| {
            let eligible =
                entry.status() != InboxStatus::Pending && entry.last_status_change_at() < cutoff;

            if eligible {
                removed += 1;
            }

            !eligible
        });

        if removed > 0 {
            debug!(removed, "Cleaned up finished inbox entries");
        }

        Ok(removed)
    }

    /// Reports the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exposes the configuration this store was created with.
    pub fn config(&self) -> &InboxConfig {
        &self.config
    }

    /// Disposes the store: every subsequent operation fails with
    /// [`Disposed`](shunt_core::ErrorKind::Disposed), and this call returns
    /// only after the background tasks have halted. A second dispose is a
    /// no-op.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Disposing inbox store");

        self.spindown.wind_down().await;
    }

    /// Reports whether the store has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Fails with [`Disposed`](shunt_core::ErrorKind::Disposed) once the
    /// store has been disposed.
    fn ensure_live(&self) -> Result<(), DispatchError> {
        if self.is_disposed() {
            return Err(DispatchError::disposed("inbox store is disposed"));
        }

        Ok(())
    }

    fn missing(message_id: &str, handler_key: &str) -> DispatchError {
        DispatchError::not_found(format!(
            "no inbox entry for message '{}' and handler '{}'",
            message_id, handler_key,
        ))
    }

    /// Schedules a background trim when the capacity cap is exceeded and no
    /// trim is already in flight.
    fn maybe_schedule_trim(self: &Arc<Self>) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };

        if self.entries.len() <= max_entries {
            return;
        }

        if self.trim_in_flight.swap(true, Ordering::AcqRel) {
            return;
        }

        let weak = Arc::downgrade(self);
        let token = self.spindown.register("inbox:trim");

        tokio::spawn(async move {
            let _token = token;

            if let Some(store) = weak.upgrade() {
                store.trim_to_capacity(max_entries);
                store.trim_in_flight.store(false, Ordering::Release);
            }
        });
    }

    /// Removes the oldest entries (by creation time) until the store is at
    /// or below the given cap.
    fn trim_to_capacity(&self, max_entries: usize) {
        let excess = self.entries.len().saturating_sub(max_entries);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(InboxKey, SystemTime)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.created_at()))
            .collect();
        by_age.sort_by_key(|(_, created_at)| *created_at);

        for (key, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }

        debug!(removed = excess, "Trimmed inbox to its capacity cap");
    }

    /// Spawns the periodic cleanup ticker.
    fn spawn_auto_cleanup(store: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(store);
        let token = store.spindown.register("inbox:auto-cleanup");
        let interval = store.config.cleanup_interval;
        let retention = store.config.retention;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            // The first tick fires immediately; skip it
            ticker.tick().await;

            loop {
                select! {
                    _ = token.stopped() => break,
                    _ = ticker.tick() => {
                        let Some(store) = weak.upgrade() else { break };

                        // A disposed store refuses cleanup; just wind down
                        if store.cleanup(retention).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shunt_core::ErrorKind;

    fn make_store() -> Arc<InboxStore> {
        InboxStore::new(InboxConfig::default())
    }

    fn insert(store: &Arc<InboxStore>, message_id: &str) -> Result<(), DispatchError> {
        store.create_entry(
            message_id,
            "handler-a",
            "orders::PlaceOrderCommand",
            vec![1, 2, 3],
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn records_and_reads_back_an_entry() {
        // Given
        let store = make_store();

        // When
        insert(&store, "msg-1").unwrap();
        let entry = store.get_entry("msg-1", "handler-a").unwrap().unwrap();

        // Then
        assert_eq!(entry.status(), InboxStatus::Pending);
        assert_eq!(entry.message_type(), "orders::PlaceOrderCommand");
        assert_eq!(entry.payload(), &[1, 2, 3]);
        assert!(store.get_entry("msg-1", "handler-b").unwrap().is_none());
    }

    #[tokio::test]
    async fn second_insert_of_the_same_key_is_a_duplicate() {
        // Given
        let store = make_store();
        insert(&store, "msg-1").unwrap();

        // When
        let error = insert(&store, "msg-1").unwrap_err();

        // Then
        assert_eq!(error.kind(), ErrorKind::Duplicate);
    }

    #[tokio::test]
    async fn empty_key_parts_are_rejected() {
        // Given
        let store = make_store();

        // Then
        assert_eq!(
            insert(&store, "").unwrap_err().kind(),
            ErrorKind::InvalidArgument,
        );
        assert_eq!(
            store
                .create_entry("msg-1", "", "t", Vec::new(), HashMap::new())
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidArgument,
        );
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_key_produce_exactly_one_winner() {
        // Given
        let store = make_store();

        // When: ten tasks race on the same key
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { insert(&store, "msg-1") }));
        }

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(error) => {
                    assert_eq!(error.kind(), ErrorKind::Duplicate);
                    duplicates += 1;
                }
            }
        }

        // Then
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 9);
    }

    #[tokio::test]
    async fn processed_entries_refuse_a_second_processing() {
        // Given
        let store = make_store();
        insert(&store, "msg-1").unwrap();

        // When
        store.mark_processed("msg-1", "handler-a").unwrap();
        let error = store.mark_processed("msg-1", "handler-a").unwrap_err();

        // Then: the error is an invalid transition and the status is kept
        assert_eq!(error.kind(), ErrorKind::InvalidTransition);
        assert_eq!(
            store
                .get_entry("msg-1", "handler-a")
                .unwrap()
                .unwrap()
                .status(),
            InboxStatus::Processed,
        );
    }

    #[tokio::test]
    async fn failing_overrides_a_processed_entry() {
        // Given
        let store = make_store();
        insert(&store, "msg-2").unwrap();
        store.mark_processed("msg-2", "handler-a").unwrap();

        // When
        store
            .mark_failed("msg-2", "handler-a", "poison message")
            .unwrap();

        // Then
        let entry = store.get_entry("msg-2", "handler-a").unwrap().unwrap();
        assert_eq!(entry.status(), InboxStatus::Failed);
        assert_eq!(entry.error_reason(), Some("poison message"));
    }

    #[tokio::test]
    async fn transitions_on_missing_entries_are_not_found() {
        // Given
        let store = make_store();

        // Then
        assert_eq!(
            store
                .mark_processed("ghost", "handler-a")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound,
        );
        assert_eq!(
            store
                .mark_failed("ghost", "handler-a", "reason")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound,
        );
    }

    #[tokio::test]
    async fn statistics_stay_internally_consistent() {
        // Given
        let store = make_store();
        insert(&store, "msg-1").unwrap();
        insert(&store, "msg-2").unwrap();
        insert(&store, "msg-3").unwrap();
        store.mark_processed("msg-1", "handler-a").unwrap();
        store.mark_failed("msg-2", "handler-a", "reason").unwrap();

        // When
        let statistics = store.statistics().unwrap();

        // Then
        assert_eq!(statistics.total, 3);
        assert_eq!(statistics.pending, 1);
        assert_eq!(statistics.processed, 1);
        assert_eq!(statistics.failed, 1);
        assert_eq!(
            statistics.pending + statistics.processed + statistics.failed,
            statistics.total,
        );
        assert!(statistics.oldest_pending_age.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn statistics_never_tear_under_contention() {
        // Given: writers hammering a small key space while a reader samples
        let store = make_store();

        let mut writers = Vec::new();
        for worker in 0..4 {
            let store = Arc::clone(&store);
            writers.push(tokio::spawn(async move {
                let mut accepted = 0usize;
                for round in 0..50 {
                    let message_id = format!("msg-{}", (worker * 50 + round) % 20);
                    if insert(&store, &message_id).is_ok() {
                        accepted += 1;
                    }
                    // Transition races with other workers are normal-path
                    let _ = store.mark_processed(&message_id, "handler-a");
                    let _ = store.mark_failed(&message_id, "handler-a", "contended");
                }
                accepted
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..100 {
                    let statistics = store.statistics().unwrap();
                    assert!(
                        statistics.pending + statistics.processed + statistics.failed
                            <= statistics.total,
                    );
                    tokio::task::yield_now().await;
                }
            })
        };

        // When
        let mut accepted_total = 0usize;
        for writer in writers {
            accepted_total += writer.await.unwrap();
        }
        reader.await.unwrap();

        // Then: exactly one insert won each of the 20 keys, and the
        // quiescent census balances
        assert_eq!(accepted_total, 20);
        let statistics = store.statistics().unwrap();
        assert_eq!(statistics.total, 20);
        assert_eq!(
            statistics.pending + statistics.processed + statistics.failed,
            statistics.total,
        );
    }

    #[tokio::test]
    async fn cleanup_removes_old_finished_entries_but_never_pending_ones() {
        // Given
        let store = make_store();
        insert(&store, "msg-1").unwrap();
        insert(&store, "msg-2").unwrap();
        insert(&store, "msg-3").unwrap();
        store.mark_processed("msg-1", "handler-a").unwrap();
        store.mark_failed("msg-2", "handler-a", "reason").unwrap();

        // When: everything older than "now" is eligible
        tokio::time::sleep(Duration::from_millis(10)).await;
        let removed = store.cleanup(Duration::ZERO).unwrap();

        // Then
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get_entry("msg-3", "handler-a").unwrap().is_some());

        // And: a generous retention removes nothing
        assert_eq!(store.cleanup(Duration::from_secs(3600)).unwrap(), 0);
    }

    #[tokio::test]
    async fn capacity_trim_eventually_enforces_the_cap() {
        // Given
        let config: InboxConfig = serde_json::from_str(r#"{"max_entries": 2}"#).unwrap();
        let store = InboxStore::new(config);

        // When
        insert(&store, "msg-1").unwrap();
        insert(&store, "msg-2").unwrap();
        insert(&store, "msg-3").unwrap();

        // Then: the trim is asynchronous and best-effort
        for _ in 0..50 {
            if store.len() <= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.len() <= 2);
    }

    #[tokio::test]
    async fn automatic_cleanup_runs_in_the_background() {
        // Given
        let config: InboxConfig = serde_json::from_str(
            r#"{"auto_cleanup": true, "cleanup_interval": "50ms", "retention": "0s"}"#,
        )
        .unwrap();
        let store = InboxStore::new(config);
        insert(&store, "msg-1").unwrap();
        store.mark_processed("msg-1", "handler-a").unwrap();

        // When
        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // Then
        assert!(store.is_empty());
        store.dispose().await;
    }

    #[tokio::test]
    async fn disposed_stores_refuse_every_operation() {
        // Given
        let store = make_store();
        insert(&store, "msg-1").unwrap();

        // When
        store.dispose().await;

        // Then
        assert_eq!(insert(&store, "msg-2").unwrap_err().kind(), ErrorKind::Disposed);
        assert_eq!(
            store
                .mark_processed("msg-1", "handler-a")
                .unwrap_err()
                .kind(),
            ErrorKind::Disposed,
        );
        assert_eq!(
            store.get_entry("msg-1", "handler-a").unwrap_err().kind(),
            ErrorKind::Disposed,
        );
        assert_eq!(store.statistics().unwrap_err().kind(), ErrorKind::Disposed);
        assert_eq!(
            store.cleanup(Duration::ZERO).unwrap_err().kind(),
            ErrorKind::Disposed,
        );

        // And: a second dispose is a no-op
        store.dispose().await;
    }
}
