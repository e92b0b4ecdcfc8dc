//! In-process metrics registry owned by the host.
//!
//! The exporter only ever reads from it through [`MetricSource`]; the host
//! registers metrics and mutates them from any thread.

mod metric;
mod name;
mod registry;

pub use metric::{Counter, Gauge, GaugeValue, Histogram, Meter, Metric, Snapshot, Timer};
pub use name::MetricName;
pub use registry::Registry;

/// Read capability over a live metrics registry.
///
/// Implementations hand out cheap handles to the metrics registered right now.
/// Values are read from the handles afterwards, so a scrape sees each metric's
/// state at the time it is read rather than one consistent snapshot.
pub trait MetricSource: Send + Sync + 'static {
    fn metrics(&self) -> Vec<(MetricName, Metric)>;
}

impl<T: MetricSource + ?Sized> MetricSource for std::sync::Arc<T> {
    fn metrics(&self) -> Vec<(MetricName, Metric)> {
        (**self).metrics()
    }
}
