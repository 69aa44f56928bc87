use hdrhistogram::Histogram as HdrHistogram;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.add(1);
    }

    /// Increments the counter by the given amount.
    pub fn add(&self, amount: u64) {
        self.value.fetch_add(amount, Ordering::Relaxed);
    }

    /// Reports the current value.
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Resets the counter to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// A counter family sliced by a fixed set of label names.
///
/// Each distinct combination of label values owns its own [`Counter`] series,
/// created on first use. The declared label arity is normalized onto every
/// lookup: surplus values are dropped, missing values fill in as empty
/// strings, so a mismatched call site degrades deterministically instead of
/// failing.
#[derive(Debug)]
pub struct LabeledCounter {
    label_names: Vec<String>,
    series: RwLock<HashMap<Vec<String>, Arc<Counter>>>,
}

impl LabeledCounter {
    /// Creates a counter family with the given label names.
    pub fn new(label_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            label_names: label_names.into_iter().map(Into::into).collect(),
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Reports the declared label names.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Returns the counter series for the given label values, creating it on
    /// first use.
    pub fn with_labels(&self, values: &[&str]) -> Arc<Counter> {
        let key = self.normalize(values);

        // Fast path: the series already exists
        if let Some(series) = self.series.read().get(&key) {
            return Arc::clone(series);
        }

        let mut series = self.series.write();

        Arc::clone(
            series
                .entry(key)
                .or_insert_with(|| Arc::new(Counter::new())),
        )
    }

    /// Shorthand for incrementing the series of the given label values by
    /// one.
    pub fn inc(&self, values: &[&str]) {
        self.with_labels(values).inc();
    }

    /// Resets every existing series to zero.
    pub fn reset(&self) {
        for series in self.series.read().values() {
            series.reset();
        }
    }

    /// Visits every existing series: label values alongside the current
    /// count.
    pub fn visit(&self, mut visitor: impl FnMut(&[String], u64)) {
        for (values, series) in self.series.read().iter() {
            visitor(values, series.value());
        }
    }

    /// Clamps the given label values to the declared arity.
    fn normalize(&self, values: &[&str]) -> Vec<String> {
        let mut key: Vec<String> = values
            .iter()
            .take(self.label_names.len())
            .map(|value| (*value).to_owned())
            .collect();
        key.resize(self.label_names.len(), String::new());

        key
    }
}

/// A gauge holding the last value set.
///
/// Unlike counters and histograms, gauges survive a registry-wide reset: the
/// last-set value remains meaningful regardless of when observation windows
/// roll over.
#[derive(Debug, Default)]
pub struct Gauge {
    bits: AtomicU64,
}

impl Gauge {
    /// Creates a gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gauge to the given value.
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reports the last value set.
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// A histogram of recorded magnitudes (typically durations in microseconds).
#[derive(Debug)]
pub struct Histogram {
    inner: Mutex<HdrHistogram<u64>>,
}

impl Histogram {
    /// Creates an auto-resizing histogram with three significant digits.
    pub fn new() -> Self {
        let inner =
            HdrHistogram::new(3).expect("three significant digits is a valid histogram precision");

        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Records a single value.
    pub fn record(&self, value: u64) {
        self.inner.lock().saturating_record(value);
    }

    /// Produces a point-in-time summary of the recorded values.
    pub fn summarize(&self) -> HistogramSummary {
        let inner = self.inner.lock();

        HistogramSummary {
            count: inner.len(),
            min: inner.min(),
            max: inner.max(),
            mean: inner.mean(),
            p50: inner.value_at_quantile(0.5),
            p99: inner.value_at_quantile(0.99),
        }
    }

    /// Discards all recorded values.
    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time summary of a [`Histogram`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    /// The number of recorded values.
    pub count: u64,
    /// The smallest recorded value.
    pub min: u64,
    /// The largest recorded value.
    pub max: u64,
    /// The arithmetic mean of the recorded values.
    pub mean: f64,
    /// The median recorded value.
    pub p50: u64,
    /// The 99th-percentile recorded value.
    pub p99: u64,
}
