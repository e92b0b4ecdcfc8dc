#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, Response};
use axum::Router;
use broker_exporter::bridge::MetricsBridge;
use broker_exporter::registry::Registry;
use broker_exporter::reporter::exposition_registry;
use broker_exporter::routes::create_router;
use broker_exporter::state::AppState;
use prometheus_parse::{Sample, Scrape, Value};

pub const PREFIX: &str = "kafka_broker_";

pub fn build_app(registry: Arc<Registry>) -> Router {
    let bridge = MetricsBridge::new(registry, PREFIX);
    let registry = exposition_registry(bridge).expect("bridge should register");
    create_router(AppState::new(registry))
}

pub fn request(path: &str, method: Method) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

/// Parses a payload and checks that every sample line was understood and
/// that no series appears twice.
pub fn parse_scrape(body: &str) -> Scrape {
    let scrape = Scrape::parse(body.lines().map(|l| Ok(l.to_string()))).expect("payload should parse");

    let sample_lines = body
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .count();
    let parsed_lines: usize = scrape
        .samples
        .iter()
        .map(|s| match &s.value {
            Value::Summary(quantiles) => quantiles.len(),
            Value::Histogram(buckets) => buckets.len(),
            _ => 1,
        })
        .sum();
    assert_eq!(parsed_lines, sample_lines, "unparsed lines in payload:\n{}", body);

    let mut seen = HashSet::new();
    for sample in &scrape.samples {
        let key = (sample.metric.clone(), labels(sample));
        assert!(seen.insert(key), "series {} appears twice", sample.metric);
    }

    scrape
}

/// Labels of a parsed sample, without the quantile label of summaries.
pub fn labels(sample: &Sample) -> BTreeMap<String, String> {
    sample
        .labels
        .iter()
        .filter(|(k, _)| k.as_str() != "quantile")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Value of a counter, gauge or untyped sample.
pub fn scalar(sample: &Sample) -> Option<f64> {
    match sample.value {
        Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => Some(v),
        _ => None,
    }
}

/// The sample of `metric` carrying exactly `labels`.
pub fn find<'a>(scrape: &'a Scrape, metric: &str, wanted: &BTreeMap<String, String>) -> Option<&'a Sample> {
    scrape
        .samples
        .iter()
        .find(|s| s.metric == metric && &labels(s) == wanted)
}
