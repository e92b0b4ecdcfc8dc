//! Translation of registry metrics into exposition families.
//!
//! The bridge reads the registry on every [`MetricsBridge::collect`] call and
//! keeps no state between calls. A metric that cannot be translated is
//! skipped and logged; the rest of the scrape is unaffected.

mod naming;

use std::collections::{BTreeMap, HashMap};

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricType};
use tracing::debug;

use crate::error::TranslationError;
use crate::exposition::{self, labels_of, series_names, type_name};
use crate::registry::{Metric, MetricName, MetricSource, Snapshot};

pub use naming::{exported_name, normalize_prefix, sanitize_metric_name, scope_labels};

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "kafka_broker";

/// Quantiles exported for histograms and timers.
const QUANTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];

/// Timer durations are recorded in nanoseconds and exported in seconds.
const NANOS_TO_SECONDS: f64 = 1e-9;

/// Read-only view of a metric source as exposition families.
///
/// Registered with a `prometheus::Registry`, it is collected on every
/// `gather()`.
pub struct MetricsBridge<S> {
    source: S,
    prefix: String,
}

impl<S: MetricSource> MetricsBridge<S> {
    /// `prefix` is normalized to end with a single `_` unless empty.
    pub fn new(source: S, prefix: &str) -> Self {
        MetricsBridge {
            source,
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Enumerates the source and translates every metric.
    ///
    /// Families come out in the source's enumeration order; metrics that map
    /// onto an already emitted family add their samples to it.
    pub fn collect(&self) -> Vec<proto::MetricFamily> {
        let mut families = Families::default();

        for (name, metric) in self.source.metrics() {
            let added = self
                .translate(&name, &metric)
                .and_then(|family| families.add(family));
            if let Err(err) = added {
                debug!(metric = %name, "Skipping metric: {}", err);
            }
        }

        families.list
    }

    fn translate(&self, name: &MetricName, metric: &Metric) -> Result<proto::MetricFamily, TranslationError> {
        let base = exported_name(&self.prefix, &name.name);
        let labels = scope_labels(name.scope.as_deref());
        let help = help_message(&base, metric);

        let family = match metric {
            Metric::Counter(counter) => single(
                &base,
                help,
                MetricType::GAUGE,
                exposition::gauge(&labels, counter.count() as f64),
            ),
            Metric::Gauge(gauge) => {
                let value = gauge.value();
                let numeric = value.as_f64().ok_or_else(|| TranslationError::UnsupportedGauge {
                    name: base.clone(),
                    value_type: value.type_name().to_string(),
                })?;
                single(&base, help, MetricType::GAUGE, exposition::gauge(&labels, numeric))
            }
            Metric::Histogram(histogram) => single(
                &base,
                help,
                MetricType::SUMMARY,
                summary(&labels, &histogram.snapshot(), histogram.count(), histogram.sum(), 1.0),
            ),
            Metric::Timer(timer) => single(
                &base,
                help,
                MetricType::SUMMARY,
                summary(&labels, &timer.snapshot(), timer.count(), timer.sum(), NANOS_TO_SECONDS),
            ),
            Metric::Meter(meter) => {
                let total = format!("{}_total", base);
                single(
                    &total,
                    help,
                    MetricType::COUNTER,
                    exposition::counter(&labels, meter.count() as f64),
                )
            }
        };

        Ok(family)
    }
}

impl<S: MetricSource> Collector for MetricsBridge<S> {
    /// Families are only known at collection time.
    fn desc(&self) -> Vec<&Desc> {
        Vec::new()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        MetricsBridge::collect(self)
    }
}

fn help_message(name: &str, metric: &Metric) -> String {
    format!(
        "Generated from registry metric import (metric={}, type={})",
        name,
        metric.type_name()
    )
}

fn single(name: &str, help: String, kind: MetricType, metric: proto::Metric) -> proto::MetricFamily {
    let mut family = exposition::family(name, help, kind);
    family.mut_metric().push(metric);
    family
}

fn summary(labels: &BTreeMap<String, String>, snapshot: &Snapshot, count: u64, sum: f64, factor: f64) -> proto::Metric {
    let quantiles = QUANTILES.iter().map(|q| (*q, snapshot.value(*q) * factor));
    exposition::summary(labels, quantiles, count, sum * factor)
}

/// Families of one collection, with every series name they write.
#[derive(Default)]
struct Families {
    list: Vec<proto::MetricFamily>,
    positions: HashMap<String, usize>,
    /// Series name to the family writing it.
    series: HashMap<String, String>,
}

impl Families {
    fn add(&mut self, mut family: proto::MetricFamily) -> Result<(), TranslationError> {
        let name = family.get_name().to_string();
        let kind = family.get_field_type();

        let position = match self.positions.get(&name).copied() {
            Some(position) => position,
            None => {
                let claimed = series_names(&name, kind);
                if let Some((series, owner)) = claimed
                    .iter()
                    .find_map(|s| self.series.get(s).map(|owner| (s, owner)))
                {
                    return Err(TranslationError::SeriesCollision {
                        name,
                        series: series.clone(),
                        owner: owner.clone(),
                    });
                }
                for series in claimed {
                    self.series.insert(series, name.clone());
                }
                self.positions.insert(name, self.list.len());
                self.list.push(family);
                return Ok(());
            }
        };

        let existing = &mut self.list[position];
        if existing.get_field_type() != kind {
            return Err(TranslationError::TypeConflict {
                name,
                existing: type_name(existing.get_field_type()).to_string(),
                requested: type_name(kind).to_string(),
            });
        }
        for metric in family.get_metric() {
            let labels = labels_of(metric);
            if existing.get_metric().iter().any(|other| labels_of(other) == labels) {
                return Err(TranslationError::DuplicateSample {
                    sample: format!("{}{:?}", name, labels),
                    name,
                });
            }
        }

        for metric in family.take_metric().into_iter() {
            existing.mut_metric().push(metric);
        }
        Ok(())
    }
}
