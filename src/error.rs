//! Error types for the exporter.

use std::net::SocketAddr;

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Errors that reach the caller of the startup entry points.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// The configured listen address could not be bound. Fatal, never retried.
    #[error("could not bind metrics endpoint to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("metrics server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("could not register the metrics bridge: {0}")]
    Register(#[source] prometheus::Error),
    #[error("could not encode metrics: {0}")]
    Encode(String),
}

/// Why a single registry metric could not be exported.
///
/// These never leave the bridge: the metric is skipped and the scrape goes on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    #[error("gauge {name} returned a non-numeric value of type {value_type}")]
    UnsupportedGauge { name: String, value_type: String },
    #[error("family {name} already exported as {existing}, cannot add {requested}")]
    TypeConflict {
        name: String,
        existing: String,
        requested: String,
    },
    #[error("family {name} already has a sample {sample} with the same labels")]
    DuplicateSample { name: String, sample: String },
    #[error("series {series} of family {name} is already written by family {owner}")]
    SeriesCollision {
        name: String,
        series: String,
        owner: String,
    },
}
