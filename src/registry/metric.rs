//! Metric primitives the host updates.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Number of most recent observations a histogram keeps for quantiles.
const WINDOW_SIZE: usize = 1028;

/// A handle to one registered metric.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn type_name(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metric::{}", self.type_name())
    }
}

/// Signed counter; can move in both directions.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn dec(&self) {
        self.add(-1);
    }

    pub fn add(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Value produced by a gauge callback.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl GaugeValue {
    /// Numeric view of the value, `None` for non-numeric gauges.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GaugeValue::Int(v) => Some(f64::from(*v)),
            GaugeValue::Long(v) => Some(*v as f64),
            GaugeValue::Float(v) => Some(f64::from(*v)),
            GaugeValue::Double(v) => Some(*v),
            GaugeValue::Text(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GaugeValue::Int(_) => "int",
            GaugeValue::Long(_) => "long",
            GaugeValue::Float(_) => "float",
            GaugeValue::Double(_) => "double",
            GaugeValue::Text(_) => "text",
        }
    }
}

/// A value computed on read.
pub struct Gauge {
    read: Box<dyn Fn() -> GaugeValue + Send + Sync>,
}

impl Gauge {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> GaugeValue + Send + Sync + 'static,
    {
        Gauge {
            read: Box::new(read),
        }
    }

    pub fn value(&self) -> GaugeValue {
        (self.read)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct HistogramState {
    window: VecDeque<f64>,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

/// Distribution of observed values over a sliding window of recent samples.
///
/// `count`, `sum`, `min` and `max` cover every observation; quantiles only
/// cover the window.
#[derive(Debug, Default)]
pub struct Histogram {
    count: AtomicU64,
    state: Mutex<HistogramState>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.window.len() == WINDOW_SIZE {
            state.window.pop_front();
        }
        state.window.push_back(value);
        state.sum += value;
        state.min = Some(state.min.map_or(value, |m| m.min(value)));
        state.max = Some(state.max.map_or(value, |m| m.max(value)));
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sum
    }

    pub fn min(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.min.unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.max.unwrap_or(0.0)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() / count as f64
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Snapshot::new(state.window.iter().copied().collect())
    }
}

/// Sorted copy of a histogram window.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: Vec<f64>,
}

impl Snapshot {
    pub fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Snapshot { values }
    }

    /// Value at `quantile` (0.0..=1.0), interpolated between neighbours.
    pub fn value(&self, quantile: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let pos = quantile * (n + 1) as f64;
        if pos < 1.0 {
            return self.values[0];
        }
        if pos >= n as f64 {
            return self.values[n - 1];
        }
        let index = pos as usize;
        let lower = self.values[index - 1];
        let upper = self.values[index];
        lower + (pos - pos.floor()) * (upper - lower)
    }

    pub fn median(&self) -> f64 {
        self.value(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.value(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.value(0.95)
    }

    pub fn p98(&self) -> f64 {
        self.value(0.98)
    }

    pub fn p99(&self) -> f64 {
        self.value(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.value(0.999)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Event counter with a mean rate since creation.
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    started: Instant,
}

impl Default for Meter {
    fn default() -> Self {
        Meter {
            count: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Events per second since the meter was created.
    pub fn mean_rate(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.count() as f64 / elapsed
        }
    }
}

/// Durations recorded in nanoseconds plus the rate at which they occur.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, duration: Duration) {
        self.histogram.update(duration.as_nanos() as f64);
        self.meter.mark(1);
    }

    /// Runs `f` and records how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.update(started.elapsed());
        out
    }

    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Sum of recorded durations, in nanoseconds.
    pub fn sum(&self) -> f64 {
        self.histogram.sum()
    }

    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }
}
