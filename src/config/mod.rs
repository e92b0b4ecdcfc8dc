//! Exporter configuration: defaults, YAML file, environment and host properties.

mod config;
mod logging;

pub use config::*;
pub use logging::*;
