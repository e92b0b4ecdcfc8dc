//! Builders for `prometheus` protobuf families and the text rendering of a
//! gathered registry.

use std::collections::BTreeMap;

use prometheus::proto::{self, LabelPair, MetricType, Quantile};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::error::{ExporterError, Result};

/// Empty family with its name, help text and type set.
pub fn family(name: &str, help: String, kind: MetricType) -> proto::MetricFamily {
    let mut family = proto::MetricFamily::default();
    family.set_name(name.to_string());
    family.set_help(help);
    family.set_field_type(kind);
    family
}

/// Metric carrying `labels`, which come sorted by name.
fn labelled(labels: &BTreeMap<String, String>) -> proto::Metric {
    let mut metric = proto::Metric::default();
    for (name, value) in labels {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }
    metric
}

pub fn gauge(labels: &BTreeMap<String, String>, value: f64) -> proto::Metric {
    let mut gauge = proto::Gauge::default();
    gauge.set_value(value);
    let mut metric = labelled(labels);
    metric.set_gauge(gauge);
    metric
}

pub fn counter(labels: &BTreeMap<String, String>, value: f64) -> proto::Metric {
    let mut counter = proto::Counter::default();
    counter.set_value(value);
    let mut metric = labelled(labels);
    metric.set_counter(counter);
    metric
}

/// Summary metric from `(quantile, value)` pairs plus count and sum.
pub fn summary(
    labels: &BTreeMap<String, String>,
    quantiles: impl IntoIterator<Item = (f64, f64)>,
    count: u64,
    sum: f64,
) -> proto::Metric {
    let mut summary = proto::Summary::default();
    for (q, value) in quantiles {
        let mut quantile = Quantile::default();
        quantile.set_quantile(q);
        quantile.set_value(value);
        summary.mut_quantile().push(quantile);
    }
    summary.set_sample_count(count);
    summary.set_sample_sum(sum);

    let mut metric = labelled(labels);
    metric.set_summary(summary);
    metric
}

/// Label pairs of a metric as a sorted map.
pub fn labels_of(metric: &proto::Metric) -> BTreeMap<String, String> {
    metric
        .get_label()
        .iter()
        .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
        .collect()
}

/// Series names a family writes to the payload.
///
/// Summaries also write `<name>_count` and `<name>_sum`.
pub fn series_names(name: &str, kind: MetricType) -> Vec<String> {
    match kind {
        MetricType::SUMMARY => vec![
            name.to_string(),
            format!("{}_count", name),
            format!("{}_sum", name),
        ],
        MetricType::HISTOGRAM => vec![
            format!("{}_bucket", name),
            format!("{}_count", name),
            format!("{}_sum", name),
        ],
        _ => vec![name.to_string()],
    }
}

pub fn type_name(kind: MetricType) -> &'static str {
    match kind {
        MetricType::COUNTER => "counter",
        MetricType::GAUGE => "gauge",
        MetricType::SUMMARY => "summary",
        MetricType::HISTOGRAM => "histogram",
        MetricType::UNTYPED => "untyped",
    }
}

/// Gathers every registered collector and renders the text format.
///
/// Returns the payload together with the encoder's content type.
pub fn render(registry: &Registry) -> Result<(String, String)> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| ExporterError::Encode(e.to_string()))?;
    let body = String::from_utf8(buffer).map_err(|e| ExporterError::Encode(e.to_string()))?;
    Ok((body, encoder.format_type().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::{Collector, Desc};

    struct Fixed(Vec<proto::MetricFamily>);

    impl Collector for Fixed {
        fn desc(&self) -> Vec<&Desc> {
            Vec::new()
        }

        fn collect(&self) -> Vec<proto::MetricFamily> {
            self.0.clone()
        }
    }

    #[test]
    fn labels_keep_their_sorted_order() {
        let labels = BTreeMap::from([
            ("topic".to_string(), "orders".to_string()),
            ("partition".to_string(), "0".to_string()),
        ]);
        let metric = gauge(&labels, 1.0);
        let names: Vec<&str> = metric.get_label().iter().map(|p| p.get_name()).collect();
        assert_eq!(names, ["partition", "topic"]);
        assert_eq!(labels_of(&metric), labels);
    }

    #[test]
    fn summaries_claim_count_and_sum_series() {
        assert_eq!(
            series_names("latency", MetricType::SUMMARY),
            ["latency", "latency_count", "latency_sum"]
        );
        assert_eq!(series_names("bytes_total", MetricType::COUNTER), ["bytes_total"]);
    }

    #[test]
    fn render_writes_help_type_and_samples() {
        let registry = Registry::new();
        let gauge_family = {
            let mut f = family("broker_messages_in", "Messages in".to_string(), MetricType::GAUGE);
            f.mut_metric().push(gauge(&BTreeMap::new(), 42.0));
            f
        };
        registry.register(Box::new(Fixed(vec![gauge_family]))).unwrap();

        let (body, content_type) = render(&registry).unwrap();
        assert_eq!(content_type, "text/plain; version=0.0.4");
        assert_eq!(
            body,
            "# HELP broker_messages_in Messages in\n# TYPE broker_messages_in gauge\nbroker_messages_in 42\n"
        );
    }

    #[test]
    fn summary_renders_quantiles_count_and_sum() {
        let registry = Registry::new();
        let mut f = family("broker_latency", "Latency".to_string(), MetricType::SUMMARY);
        let labels = BTreeMap::from([("topic".to_string(), "a\"b".to_string())]);
        f.mut_metric().push(summary(&labels, [(0.5, 2.0), (0.99, 9.0)], 3, 12.5));
        registry.register(Box::new(Fixed(vec![f]))).unwrap();

        let (body, _) = render(&registry).unwrap();
        assert!(body.contains("broker_latency{topic=\"a\\\"b\",quantile=\"0.5\"} 2\n"));
        assert!(body.contains("broker_latency{topic=\"a\\\"b\",quantile=\"0.99\"} 9\n"));
        assert!(body.contains("broker_latency_sum{topic=\"a\\\"b\"} 12.5\n"));
        assert!(body.contains("broker_latency_count{topic=\"a\\\"b\"} 3\n"));
    }
}
