//! GPU telemetry collector for a pluggable Prometheus-style exporter.
//!
//! On every scrape the [`GpuCollector`] enumerates the GPUs reported by the
//! device-management library (NVML by default), reads utilisation,
//! temperature and memory usage for each one and emits them as gauge
//! samples labelled with `gpu_index` and `gpu_name`.
//!
//! # Example
//!
//! ```no_run
//! use gpu_exporter_collector::{
//!     collector, encode_text, CollectorRegistry, ExporterConfig, Sample,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = CollectorRegistry::new(collector::registrations(), &ExporterConfig::default())?;
//!
//!     let mut samples: Vec<Sample> = Vec::new();
//!     registry.scrape(&mut samples)?;
//!     print!("{}", encode_text(&samples)?);
//!     Ok(())
//! }
//! ```

pub use collector::{Collector, CollectorContext, GpuCollector, Registration};
pub use config::{ExporterConfig, DEFAULT_NAMESPACE};
pub use device::{DeviceHandle, DeviceLibrary, FakeDevice, FakeLibrary, MemoryInfo};
#[cfg(feature = "nvml")]
pub use device::NvmlLibrary;
pub use error::{CollectorError, QueryError, QueryResult, Result};
pub use exposition::{encode_families, encode_registry, encode_text, TEXT_CONTENT_TYPE};
pub use metric::{gather, new_desc, Desc, MetricSink, Sample};
pub use registry::CollectorRegistry;

pub mod collector;
pub mod config;
pub mod device;
pub mod error;
pub mod exposition;
pub mod metric;
pub mod registry;

/// Version of the gpu-exporter-collector library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn version() -> &'static str {
    VERSION
}
