//! Standalone exporter with a simulated broker registry.
//!
//! Usage: `broker-exporter [--config <path>] [--print-schema]`

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use broker_exporter::config::{print_schema, ExporterConfig};
use broker_exporter::registry::{GaugeValue, MetricName, Registry};
use broker_exporter::reporter;
use broker_exporter::utils::logger::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--print-schema" => {
                print_schema();
                return;
            }
            "--config" => config_path = args.next().map(PathBuf::from),
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
    }

    let config = match ExporterConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let registry = Arc::new(Registry::new());
    simulate_broker(registry.clone());

    let server = match reporter::start(&config, registry).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Could not start metrics exporter");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for shutdown signal");
    }
    info!("Shutting down");
    if let Err(e) = server.shutdown().await {
        error!(error = %e, "Metrics server did not stop cleanly");
    }
}

/// Registers a handful of broker-like metrics and keeps them moving.
fn simulate_broker(registry: Arc<Registry>) {
    let topic_metrics = |name: &str| MetricName::new("kafka.server", "BrokerTopicMetrics", name);

    let messages_in = registry.meter(topic_metrics("MessagesInPerSec"));
    let bytes_in = registry.meter(topic_metrics("BytesInPerSec").with_scope("topic.orders"));
    let connections = registry.counter(MetricName::new("kafka.network", "SocketServer", "connections"));
    let message_size = registry.histogram(MetricName::new("kafka.log", "Log", "MessageSize"));
    let produce_time = registry.timer(
        MetricName::new("kafka.network", "RequestMetrics", "TotalTimeMs").with_scope("request.Produce"),
    );

    let leaders = Arc::new(AtomicI64::new(12));
    let leaders_reader = leaders.clone();
    registry.gauge(
        MetricName::new("kafka.server", "ReplicaManager", "LeaderCount"),
        move || GaugeValue::Long(leaders_reader.load(Ordering::Relaxed)),
    );
    registry.gauge(
        MetricName::new("kafka.server", "KafkaServer", "BrokerState"),
        || GaugeValue::Text("RunningAsBroker".to_string()),
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            tick += 1;
            messages_in.mark(10 + tick % 7);
            bytes_in.mark(1024 * (1 + tick % 3));
            message_size.update((100 + (tick * 37) % 900) as f64);
            produce_time.update(Duration::from_micros(500 + (tick * 131) % 4000));
            if tick % 5 == 0 {
                connections.inc();
            }
            if tick % 11 == 0 {
                connections.dec();
                leaders.fetch_add(1, Ordering::Relaxed);
            }
        }
    });
}
