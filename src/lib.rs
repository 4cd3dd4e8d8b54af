//! # cachemgr-exporter
//!
//! Prometheus exporter for cache-server management-interface counters.
//! Fetches a raw counters snapshot per scrape, maps recognized keys to a
//! fixed descriptor set built at startup, and reports an independent
//! `up` liveness signal per monitored host.
//!
//! The descriptor set is immutable for the process lifetime, so everything
//! [`Exporter`] can emit during collection was advertised at registration
//! time. Counters whose key is not in the catalog are dropped silently; the
//! upstream counter catalog may evolve independently of this exporter and a
//! missing key is policy, not an error.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod exporter;

pub use catalog::{CounterEntry, CounterRegistry, COUNTERS, NAMESPACE};
pub use client::{CounterClient, CounterSample, ManagementClient};
pub use config::{ExporterConfig, Labels};
pub use error::ExporterError;
pub use exporter::Exporter;

use prometheus::Registry;

/// Build a Prometheus registry with the exporter already registered
pub fn build_registry(config: &ExporterConfig) -> Result<Registry, ExporterError> {
    let exporter = Exporter::new(config)?;
    let registry = Registry::new();
    registry.register(Box::new(exporter))?;
    Ok(registry)
}
