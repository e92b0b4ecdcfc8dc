//! Exposes a host process's in-memory metrics registry as a Prometheus
//! text endpoint.

pub mod bridge;
pub mod config;
pub mod error;
pub mod exposition;
pub mod registry;
pub mod reporter;
pub mod routes;
pub mod startup;
pub mod state;
pub mod utils;
