use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// The default grace period granted to registered workloads during a
/// wind-down.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// An instance-owned supervisor for background workloads.
///
/// A component that spawns background tasks (a store with a cleanup ticker, a
/// transport with a polling loop) owns one `Spindown`. Every spawned task
/// [registers](Spindown::register) under a human-readable name and receives a
/// [`WorkToken`], through which it observes the stop signal and later reports
/// its own completion.
///
/// Disposing the owning component calls [`wind_down`](Spindown::wind_down):
/// the stop signal fires, and the call waits (within a timeout) until every
/// registered workload has punched out. Workloads registered while the
/// wind-down is in progress are collected in repeated cycles, so nothing
/// slips through the gap between signal and wait.
///
/// ## Example
///
/// ```
/// use shunt_sync::Spindown;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let spindown = Arc::new(Spindown::new());
/// let token = spindown.register("ticker");
///
/// tokio::spawn(async move {
///     // Work until the stop signal arrives
///     token.stopped().await;
///
///     // Clean up, then let the token drop to punch out
/// });
///
/// let report = spindown.wind_down().await;
/// assert!(report.is_clean());
/// # });
/// ```
pub struct Spindown {
    stop: CancellationToken,
    workloads: Mutex<Vec<Workload>>,
    timeout: Duration,
}

/// A registered workload: a name for the logs plus the completion token the
/// supervisor waits on.
struct Workload {
    name: Arc<str>,
    done: CancellationToken,
}

impl Spindown {
    /// Creates a supervisor with the default wind-down timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a supervisor with the given wind-down timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            stop: CancellationToken::new(),
            workloads: Mutex::new(Vec::new()),
            timeout,
        }
    }

    /// Registers a workload under the given name (names need not be unique)
    /// and returns its [`WorkToken`].
    pub fn register(&self, name: &str) -> WorkToken {
        let workload = Workload {
            name: Arc::from(name),
            done: CancellationToken::new(),
        };
        let token = WorkToken {
            name: Arc::clone(&workload.name),
            stop: self.stop.clone(),
            done: workload.done.clone(),
        };

        self.workloads.lock().push(workload);

        token
    }

    /// Fires the stop signal without waiting for anything. Repeated calls
    /// have no additional effect.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Reports whether the stop signal has fired.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Fires the stop signal, then waits for every registered workload to
    /// punch out, within this supervisor's timeout.
    ///
    /// The wait proceeds in cycles: each cycle drains the currently
    /// registered workloads and awaits their completion; if new workloads
    /// registered in the meantime, another cycle collects them. All cycles
    /// share a single deadline.
    pub async fn wind_down(&self) -> WindDownReport {
        self.stop.cancel();

        let deadline = Instant::now() + self.timeout;
        let mut completed = 0usize;

        loop {
            // Take currently registered workloads, leaving an empty vector
            let batch = std::mem::take(&mut *self.workloads.lock());

            if batch.is_empty() {
                debug!(completed, "Wind-down completed");
                return WindDownReport {
                    completed,
                    timed_out: 0,
                };
            }

            info!(
                remaining = batch.len(),
                "Waiting for registered workloads to punch out",
            );

            for (index, workload) in batch.iter().enumerate() {
                let waited = tokio::time::timeout_at(deadline, workload.done.cancelled()).await;

                if waited.is_err() {
                    // Deadline lapsed: report every workload still pending
                    for straggler in &batch[index..] {
                        if !straggler.done.is_cancelled() {
                            error!(
                                workload = straggler.name.as_ref(),
                                "Did not punch out in time during wind-down",
                            );
                        }
                    }

                    let timed_out = batch[index..]
                        .iter()
                        .filter(|workload| !workload.done.is_cancelled())
                        .count();

                    return WindDownReport {
                        completed: completed + (batch.len() - index - timed_out),
                        timed_out,
                    };
                }

                completed += 1;
            }
        }
    }
}

impl Default for Spindown {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of a [`wind_down`](Spindown::wind_down): how many workloads
/// punched out and how many were still pending when the timeout lapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindDownReport {
    completed: usize,
    timed_out: usize,
}

impl WindDownReport {
    /// Reports the number of workloads that punched out in time.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Reports the number of workloads that did not punch out in time.
    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    /// Reports whether every workload punched out in time.
    pub fn is_clean(&self) -> bool {
        self.timed_out == 0
    }
}

/// The token held by a registered workload.
///
/// Through this token the workload observes the owner's stop signal
/// ([`stopped`](WorkToken::stopped) or [`should_stop`](WorkToken::should_stop))
/// and reports its own completion ([`punch_out`](WorkToken::punch_out)).
/// Dropping the token punches out implicitly, so a task that simply returns
/// counts as completed.
pub struct WorkToken {
    name: Arc<str>,
    stop: CancellationToken,
    done: CancellationToken,
}

impl WorkToken {
    /// Reports the name this workload was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits until the owner fires the stop signal. Resolves immediately if
    /// the signal has already fired.
    pub async fn stopped(&self) {
        self.stop.cancelled().await;
    }

    /// Reports whether the stop signal has fired.
    pub fn should_stop(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Exposes a clone of the stop signal for use in `select!` branches.
    pub fn stop_signal(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Reports this workload as completed. Called automatically when the
    /// token is dropped.
    pub fn punch_out(&self) {
        self.done.cancel();
    }
}

impl Drop for WorkToken {
    fn drop(&mut self) {
        self.punch_out();
    }
}
