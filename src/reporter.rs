//! Entry points used by the host process.

use std::collections::HashMap;

use tracing::info;

use crate::bridge::MetricsBridge;
use crate::config::ExporterConfig;
use crate::error::{ExporterError, Result};
use crate::registry::MetricSource;
use crate::startup::{self, RunningServer};

/// Plugin hook: reads the host properties, wraps `registry` in a bridge and
/// starts serving it.
///
/// Called once by the host. A bind failure is returned as-is; whether it
/// aborts the host is the host's decision.
pub async fn init<S: MetricSource>(props: &HashMap<String, String>, registry: S) -> Result<RunningServer> {
    let config = ExporterConfig::from_properties(props)?;
    start(&config, registry).await
}

/// Starts the exporter from an already loaded configuration.
pub async fn start<S: MetricSource>(config: &ExporterConfig, registry: S) -> Result<RunningServer> {
    let addr = config.bind_address()?;
    let bridge = MetricsBridge::new(registry, &config.prefix);
    info!(prefix = bridge.prefix(), %addr, read_timeout_ms = config.read_timeout_ms, "Starting metrics exporter");
    startup::start(addr, config.read_timeout(), exposition_registry(bridge)?).await
}

/// Prometheus registry with `bridge` as its only collector.
pub fn exposition_registry<S: MetricSource>(bridge: MetricsBridge<S>) -> Result<prometheus::Registry> {
    let registry = prometheus::Registry::new();
    registry
        .register(Box::new(bridge))
        .map_err(ExporterError::Register)?;
    Ok(registry)
}
