use crate::adapter::{
    HealthReport, HealthStatus, TransportAdapter, TransportHealth, TransportType,
};
use crate::message::TransportMessage;
use async_trait::async_trait;
use nonempty::NonEmpty;
use serde::Deserialize;
use shunt_core::{DispatchError, DispatchResult, ErrorKind, InboundDispatcher};
use shunt_sync::Spindown;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::select;
use tracing::{debug, trace};

/// The synthetic type name cron messages declare, which the dispatch edge
/// derives the `Event` kind from.
pub const TIMER_MESSAGE_TYPE: &str = "schedules.TimerElapsedEvent";

/// One schedule of the cron transport.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CronEntry {
    /// The schedule name, stamped onto every emitted message.
    pub name: String,
    /// How often the schedule fires.
    #[serde(deserialize_with = "shunt_core::serde_duration::deserialize")]
    pub interval: Duration,
    /// The logical destination of the emitted messages.
    pub destination: String,
}

/// The configuration section of a [`CronTransport`].
///
/// ## Example
///
/// ```
/// use shunt_transport::CronScheduleConfig;
///
/// let config: CronScheduleConfig = serde_json::from_str(
///     r#"{
///         "entries": [
///             {"name": "retention", "interval": "5m", "destination": "maintenance/retention"}
///         ]
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(config.entries.len(), 1);
/// ```
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct CronScheduleConfig {
    /// The configured schedules. At least one is required to construct the
    /// transport.
    pub entries: Vec<CronEntry>,
}

/// A subscribe-only transport that emits synthetic timer messages on
/// configured schedules.
///
/// Each schedule runs on its own background task, registered with the
/// transport's spindown supervisor; [`stop`](TransportAdapter::stop) halts
/// all of them and is terminal — a stopped cron transport does not restart.
pub struct CronTransport {
    name: String,
    entries: NonEmpty<CronEntry>,
    dispatcher: Arc<dyn InboundDispatcher>,
    running: AtomicBool,
    spindown: Spindown,
}

impl std::fmt::Debug for CronTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronTransport")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("running", &self.running)
            .finish()
    }
}

impl CronTransport {
    /// Creates a cron transport from the given configuration.
    ///
    /// Fails with
    /// [`ConfigurationError`](shunt_core::ErrorKind::ConfigurationError)
    /// when the configuration holds no schedules.
    pub fn new(
        name: impl Into<String>,
        config: CronScheduleConfig,
        dispatcher: Arc<dyn InboundDispatcher>,
    ) -> Result<Self, DispatchError> {
        let entries = NonEmpty::from_vec(config.entries).ok_or_else(|| {
            DispatchError::configuration("cron schedule must contain at least one entry")
        })?;

        Ok(Self {
            name: name.into(),
            entries,
            dispatcher,
            running: AtomicBool::new(false),
            spindown: Spindown::new(),
        })
    }

    /// Reports the configured schedules.
    pub fn entries(&self) -> &NonEmpty<CronEntry> {
        &self.entries
    }

    /// Spawns one ticker task for the given schedule.
    fn spawn_schedule(&self, entry: CronEntry) {
        let token = self
            .spindown
            .register(&format!("cron:{}:{}", self.name, entry.name));
        let dispatcher = Arc::clone(&self.dispatcher);
        let transport_name = self.name.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(entry.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            // The first tick fires immediately; skip it
            ticker.tick().await;

            loop {
                select! {
                    _ = token.stopped() => break,
                    _ = ticker.tick() => {
                        let message = TransportMessage::new(Vec::new())
                            .with_type_name(TIMER_MESSAGE_TYPE)
                            .with_header("X-Schedule-Name", entry.name.clone());

                        let mut context = message.build_context(&transport_name);
                        context.set_transport_property("cron.schedule", entry.name.clone());
                        context.set_transport_property(
                            "cron.destination",
                            entry.destination.clone(),
                        );

                        trace!(
                            schedule = entry.name.as_str(),
                            destination = entry.destination.as_str(),
                            "Schedule elapsed",
                        );

                        let cancellation = token.stop_signal();
                        let result = dispatcher
                            .dispatch(Arc::new(message), &mut context, &cancellation)
                            .await;

                        if !result.succeeded() {
                            debug!(
                                schedule = entry.name.as_str(),
                                error = ?result.error(),
                                "Scheduled dispatch failed",
                            );
                        }
                    }
                }
            }
        });
    }
}

#[async_trait]
impl TransportAdapter for CronTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Cron
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn supports_subscription(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), DispatchError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        for entry in self.entries.iter() {
            self.spawn_schedule(entry.clone());
        }

        debug!(
            transport = self.name.as_str(),
            schedules = self.entries.len(),
            "Started cron transport",
        );

        Ok(())
    }

    async fn stop(&self) -> Result<(), DispatchError> {
        self.running.store(false, Ordering::Release);
        self.spindown.wind_down().await;

        Ok(())
    }

    async fn send(
        &self,
        _message: TransportMessage,
        destination: &str,
        _token: &tokio_util::sync::CancellationToken,
    ) -> DispatchResult {
        DispatchResult::failure(
            ErrorKind::InvalidArgument,
            format!(
                "cron transport '{}' cannot send (destination '{}')",
                self.name, destination,
            ),
        )
    }

    async fn receive(
        &self,
        message: TransportMessage,
        dispatcher: &dyn InboundDispatcher,
        token: &tokio_util::sync::CancellationToken,
    ) -> DispatchResult {
        let mut context = message.build_context(&self.name);

        dispatcher.dispatch(Arc::new(message), &mut context, token).await
    }

    fn health(&self) -> Option<&dyn TransportHealth> {
        Some(self)
    }
}

impl TransportHealth for CronTransport {
    fn quick_check(&self) -> HealthReport {
        let report = if self.is_running() {
            HealthReport::new(HealthStatus::Healthy, "schedules running", "scheduler")
        } else {
            HealthReport::new(HealthStatus::Unhealthy, "schedules stopped", "scheduler")
        };

        report.with_metric("schedules", self.entries.len() as f64)
    }
}
