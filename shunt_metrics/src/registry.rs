use crate::instrument::{Counter, Gauge, Histogram, HistogramSummary, LabeledCounter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

// Global singleton registry, lazily initialized
static GLOBAL: OnceLock<MetricRegistry> = OnceLock::new();

/// A registry of named metric instruments.
///
/// The runtime's own instrumentation writes to the
/// [global](MetricRegistry::global) registry; tests construct standalone
/// instances.
///
/// ## Name scope
///
/// Plain counters and labeled counters share one name scope. Requesting an
/// existing name with the same shape returns the same instance. Requesting an
/// existing name with a different shape (a labeled counter where a plain one
/// lives, different label names, and so on) deterministically yields a
/// *detached* instrument: usable, but owned by the caller alone and invisible
/// to [`collect_snapshots`](MetricRegistry::collect_snapshots). The first
/// registration owns the name.
pub struct MetricRegistry {
    counters: RwLock<HashMap<String, CounterSlot>>,
    gauges: RwLock<HashMap<String, Arc<Gauge>>>,
    histograms: RwLock<HashMap<String, Arc<Histogram>>>,
}

/// The shared name scope of plain and labeled counters.
enum CounterSlot {
    Plain(Arc<Counter>),
    Labeled(Arc<LabeledCounter>),
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    /// Exposes the process-wide registry, lazily initialized.
    pub fn global() -> &'static MetricRegistry {
        GLOBAL.get_or_init(MetricRegistry::new)
    }

    /// Returns the counter with the given name, registering it on first use.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        // Fast path: the counter already exists under this name
        if let Some(CounterSlot::Plain(counter)) = self.counters.read().get(name) {
            return Arc::clone(counter);
        }

        let mut counters = self.counters.write();

        match counters.get(name) {
            Some(CounterSlot::Plain(counter)) => Arc::clone(counter),
            // The name is owned by a labeled counter: hand out a detached one
            Some(CounterSlot::Labeled(_)) => Arc::new(Counter::new()),
            None => {
                let counter = Arc::new(Counter::new());
                counters.insert(name.to_owned(), CounterSlot::Plain(Arc::clone(&counter)));

                counter
            }
        }
    }

    /// Returns the labeled counter with the given name and label names,
    /// registering it on first use.
    pub fn labeled_counter(&self, name: &str, label_names: &[&str]) -> Arc<LabeledCounter> {
        {
            let counters = self.counters.read();
            if let Some(CounterSlot::Labeled(counter)) = counters.get(name) {
                if Self::labels_match(counter, label_names) {
                    return Arc::clone(counter);
                }
            }
        }

        let mut counters = self.counters.write();

        match counters.get(name) {
            Some(CounterSlot::Labeled(counter)) if Self::labels_match(counter, label_names) => {
                Arc::clone(counter)
            }
            // The name is owned by a different shape: hand out a detached one
            Some(_) => Arc::new(LabeledCounter::new(label_names.iter().copied())),
            None => {
                let counter = Arc::new(LabeledCounter::new(label_names.iter().copied()));
                counters.insert(name.to_owned(), CounterSlot::Labeled(Arc::clone(&counter)));

                counter
            }
        }
    }

    /// Returns the gauge with the given name, registering it on first use.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        if let Some(gauge) = self.gauges.read().get(name) {
            return Arc::clone(gauge);
        }

        let mut gauges = self.gauges.write();

        Arc::clone(
            gauges
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Gauge::new())),
        )
    }

    /// Returns the histogram with the given name, registering it on first
    /// use.
    pub fn histogram(&self, name: &str) -> Arc<Histogram> {
        if let Some(histogram) = self.histograms.read().get(name) {
            return Arc::clone(histogram);
        }

        let mut histograms = self.histograms.write();

        Arc::clone(
            histograms
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Histogram::new())),
        )
    }

    /// Zeroes every counter, labeled counter, and histogram. Gauges retain
    /// their last-set value.
    pub fn reset_all(&self) {
        for slot in self.counters.read().values() {
            match slot {
                CounterSlot::Plain(counter) => counter.reset(),
                CounterSlot::Labeled(counter) => counter.reset(),
            }
        }

        for histogram in self.histograms.read().values() {
            histogram.reset();
        }
    }

    /// Collects a point-in-time snapshot of every registered instrument: one
    /// entry per counter, gauge, and histogram, plus one entry per label
    /// combination of each labeled counter.
    pub fn collect_snapshots(&self) -> Vec<MetricSnapshot> {
        let mut snapshots = Vec::new();

        for (name, slot) in self.counters.read().iter() {
            match slot {
                CounterSlot::Plain(counter) => snapshots.push(MetricSnapshot {
                    name: name.clone(),
                    labels: Vec::new(),
                    value: MetricValue::Counter(counter.value()),
                }),
                CounterSlot::Labeled(counter) => {
                    counter.visit(|values, count| {
                        let labels = counter
                            .label_names()
                            .iter()
                            .cloned()
                            .zip(values.iter().cloned())
                            .collect();

                        snapshots.push(MetricSnapshot {
                            name: name.clone(),
                            labels,
                            value: MetricValue::Counter(count),
                        });
                    });
                }
            }
        }

        for (name, gauge) in self.gauges.read().iter() {
            snapshots.push(MetricSnapshot {
                name: name.clone(),
                labels: Vec::new(),
                value: MetricValue::Gauge(gauge.value()),
            });
        }

        for (name, histogram) in self.histograms.read().iter() {
            snapshots.push(MetricSnapshot {
                name: name.clone(),
                labels: Vec::new(),
                value: MetricValue::Histogram(histogram.summarize()),
            });
        }

        snapshots
    }

    fn labels_match(counter: &LabeledCounter, label_names: &[&str]) -> bool {
        counter.label_names().len() == label_names.len()
            && counter
                .label_names()
                .iter()
                .zip(label_names.iter())
                .all(|(a, b)| a == b)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One collected metric observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    /// The instrument name.
    pub name: String,
    /// The label pairs of a labeled-counter series; empty for everything
    /// else.
    pub labels: Vec<(String, String)>,
    /// The observed value.
    pub value: MetricValue,
}

/// The value of one collected metric observation.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter value.
    Counter(u64),
    /// A gauge value.
    Gauge(f64),
    /// A histogram summary.
    Histogram(HistogramSummary),
}
