use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use super::metric::{Counter, Gauge, GaugeValue, Histogram, Meter, Metric, Timer};
use super::name::MetricName;
use super::MetricSource;

/// Thread-safe map of named metrics.
///
/// The lock only guards the name map; metric values are updated through the
/// returned handles without touching it.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<MetricName, Metric>>,
}

macro_rules! get_or_create {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Returns the ", stringify!($fn_name), " registered under `name`, creating it if needed.")]
        pub fn $fn_name(&self, name: MetricName) -> Arc<$ty> {
            let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = metrics.get(&name) {
                if let Metric::$variant(handle) = existing {
                    return handle.clone();
                }
                warn!(
                    metric = %name,
                    existing = existing.type_name(),
                    "Replacing metric registered with a different type"
                );
            }
            let handle = Arc::new(<$ty>::new());
            metrics.insert(name, Metric::$variant(handle.clone()));
            handle
        }
    };
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    get_or_create!(counter, Counter, Counter);
    get_or_create!(histogram, Histogram, Histogram);
    get_or_create!(meter, Meter, Meter);
    get_or_create!(timer, Timer, Timer);

    /// Registers a gauge, replacing any metric already under `name`.
    pub fn gauge<F>(&self, name: MetricName, read: F) -> Arc<Gauge>
    where
        F: Fn() -> GaugeValue + Send + Sync + 'static,
    {
        let handle = Arc::new(Gauge::new(read));
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Metric::Gauge(handle.clone()));
        handle
    }

    pub fn remove(&self, name: &MetricName) -> bool {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricSource for Registry {
    fn metrics(&self) -> Vec<(MetricName, Metric)> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> MetricName {
        MetricName::new("kafka.server", "BrokerTopicMetrics", n)
    }

    #[test]
    fn returns_the_same_handle_for_the_same_name() {
        let registry = Registry::new();
        registry.counter(name("a")).inc();
        registry.counter(name("a")).inc();
        assert_eq!(registry.counter(name("a")).count(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn type_mismatch_replaces_the_metric() {
        let registry = Registry::new();
        registry.counter(name("a")).add(4);
        let meter = registry.meter(name("a"));
        meter.mark(1);
        let metrics = registry.metrics();
        assert_eq!(metrics.len(), 1);
        assert!(matches!(metrics[0].1, Metric::Meter(_)));
    }

    #[test]
    fn enumerates_in_name_order() {
        let registry = Registry::new();
        registry.timer(name("c"));
        registry.gauge(name("a"), || GaugeValue::Int(1));
        registry.histogram(name("b"));
        let names: Vec<String> = registry
            .metrics()
            .into_iter()
            .map(|(n, _)| n.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn remove_drops_the_metric() {
        let registry = Registry::new();
        registry.counter(name("a"));
        assert!(registry.remove(&name("a")));
        assert!(!registry.remove(&name("a")));
        assert!(registry.is_empty());
    }
}
