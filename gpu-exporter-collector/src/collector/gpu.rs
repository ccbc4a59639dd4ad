use std::sync::Arc;

use tracing::{debug, error, warn, Span};

use super::Collector;
#[cfg(feature = "nvml")]
use super::CollectorContext;
use crate::device::{DeviceLibrary, MemoryInfo};
#[cfg(feature = "nvml")]
use crate::device::NvmlLibrary;
use crate::error::{CollectorError, Result};
use crate::metric::{new_desc, Desc, MetricSink, Sample};

/// Name the GPU collector is registered under.
pub const COLLECTOR_NAME: &str = "nvidia";

const SUBSYSTEM: &str = "gpu";
const LABELS: [&str; 2] = ["gpu_index", "gpu_name"];
const UNKNOWN_NAME: &str = "unknown";

struct GpuDescs {
    utilization: Arc<Desc>,
    temperature: Arc<Desc>,
    memory_total: Arc<Desc>,
    memory_used: Arc<Desc>,
    memory_free: Arc<Desc>,
    info: Arc<Desc>,
}

impl GpuDescs {
    fn new(namespace: &str) -> Result<Self> {
        let desc = |name: &str, help: &str| -> Result<Arc<Desc>> {
            Ok(Arc::new(new_desc(namespace, SUBSYSTEM, name, help, &LABELS)?))
        };

        Ok(Self {
            utilization: desc("utilisation_percentage", "GPU utilisation in percent.")?,
            temperature: desc("temperature_celsius", "GPU temperature in Celsius.")?,
            memory_total: desc("memory_total_bytes", "Total GPU memory in bytes.")?,
            memory_used: desc("memory_used_bytes", "Used GPU memory in bytes.")?,
            memory_free: desc("memory_free_bytes", "Free GPU memory in bytes.")?,
            info: desc("info", "Static GPU information (e.g. index and name).")?,
        })
    }

    fn all(&self) -> [&Arc<Desc>; 6] {
        [
            &self.utilization,
            &self.temperature,
            &self.memory_total,
            &self.memory_used,
            &self.memory_free,
            &self.info,
        ]
    }
}

/// Everything read from one device during an update.
struct DeviceReading {
    index: u32,
    name: String,
    utilization: u32,
    temperature: u32,
    memory: MemoryInfo,
}

/// Exports utilisation, temperature and memory usage for every GPU the
/// device library reports.
pub struct GpuCollector<L> {
    library: L,
    descs: GpuDescs,
    logger: Span,
}

#[cfg(feature = "nvml")]
impl GpuCollector<NvmlLibrary> {
    /// Initialise NVML and build the collector under the default namespace.
    pub fn new(logger: Span) -> Result<Self> {
        let library = NvmlLibrary::init().map_err(CollectorError::Initialization)?;
        Self::with_library(library, crate::config::DEFAULT_NAMESPACE, logger)
    }
}

/// Factory used by the registration list.
#[cfg(feature = "nvml")]
pub(crate) fn new_nvml_collector(ctx: CollectorContext) -> Result<Box<dyn Collector>> {
    let library = NvmlLibrary::init().map_err(CollectorError::Initialization)?;
    let collector = GpuCollector::with_library(library, &ctx.namespace, ctx.logger)?;
    Ok(Box::new(collector))
}

impl<L: DeviceLibrary> GpuCollector<L> {
    /// Build a collector over an already initialised device library.
    pub fn with_library(library: L, namespace: &str, logger: Span) -> Result<Self> {
        let descs = GpuDescs::new(namespace)?;
        Ok(Self {
            library,
            descs,
            logger,
        })
    }

    /// Fully-qualified names of the metrics this collector emits.
    pub fn metric_names(&self) -> [&str; 6] {
        self.descs.all().map(|d| d.fq_name.as_str())
    }

    /// Read one device. Returns `None` when the device must be skipped.
    fn read_device(&self, index: u32) -> Option<DeviceReading> {
        let device = match self.library.device_by_index(index) {
            Ok(device) => device,
            Err(e) => {
                warn!(gpu_index = index, error = %e, "failed to get handle for GPU device");
                return None;
            }
        };

        let name = device.name().unwrap_or_else(|e| {
            warn!(gpu_index = index, error = %e, "failed to get GPU name");
            UNKNOWN_NAME.to_string()
        });

        let utilization = device
            .utilization()
            .map_err(|e| warn!(gpu_index = index, error = %e, "failed to get GPU utilization"))
            .ok()?;

        let temperature = device
            .temperature()
            .map_err(|e| warn!(gpu_index = index, error = %e, "failed to get GPU temperature"))
            .ok()?;

        let memory = device
            .memory_info()
            .map_err(|e| warn!(gpu_index = index, error = %e, "failed to get GPU memory info"))
            .ok()?;

        Some(DeviceReading {
            index,
            name,
            utilization,
            temperature,
            memory,
        })
    }

    fn samples(&self, reading: &DeviceReading) -> Result<Vec<Sample>> {
        let labels = vec![reading.index.to_string(), reading.name.clone()];
        let d = &self.descs;

        Ok(vec![
            Sample::new(&d.utilization, f64::from(reading.utilization), labels.clone())?,
            Sample::new(&d.temperature, f64::from(reading.temperature), labels.clone())?,
            Sample::new(&d.memory_total, reading.memory.total as f64, labels.clone())?,
            Sample::new(&d.memory_used, reading.memory.used as f64, labels.clone())?,
            Sample::new(&d.memory_free, reading.memory.free as f64, labels.clone())?,
            Sample::new(&d.info, 1.0, labels)?,
        ])
    }
}

impl<L: DeviceLibrary> Collector for GpuCollector<L> {
    fn descs(&self) -> Vec<&Desc> {
        self.descs.all().into_iter().map(|d| &**d).collect()
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<()> {
        let _entered = self.logger.enter();

        let count = self.library.device_count().map_err(|e| {
            error!(error = %e, "failed to get GPU count");
            CollectorError::DeviceCount(e)
        })?;
        if count == 0 {
            return Err(CollectorError::NoDevices);
        }

        for index in 0..count {
            let Some(reading) = self.read_device(index) else {
                continue;
            };

            debug!(
                gpu_index = index,
                gpu_name = %reading.name,
                utilization = reading.utilization,
                temperature = reading.temperature,
                "read GPU"
            );

            let samples = match self.samples(&reading) {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(gpu_index = index, error = %e, "failed to build GPU samples");
                    continue;
                }
            };

            for sample in samples {
                if !sink.emit(sample) {
                    return Err(CollectorError::SinkClosed);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FakeDevice, FakeLibrary};
    use crate::error::QueryError;

    fn memory(total: u64, used: u64) -> MemoryInfo {
        MemoryInfo {
            total,
            used,
            free: total - used,
        }
    }

    #[test]
    fn test_metric_names() {
        let collector =
            GpuCollector::with_library(FakeLibrary::default(), "node", Span::none()).unwrap();

        assert_eq!(
            collector.metric_names(),
            [
                "node_gpu_utilisation_percentage",
                "node_gpu_temperature_celsius",
                "node_gpu_memory_total_bytes",
                "node_gpu_memory_used_bytes",
                "node_gpu_memory_free_bytes",
                "node_gpu_info",
            ]
        );
    }

    #[test]
    fn test_invalid_namespace_fails_construction() {
        let result = GpuCollector::with_library(FakeLibrary::default(), "my-exporter", Span::none());
        assert!(matches!(result, Err(CollectorError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_sample_order_and_values() {
        let library = FakeLibrary::new(vec![FakeDevice::new("A", 50, 60, memory(100, 40))]);
        let collector = GpuCollector::with_library(library, "node", Span::none()).unwrap();

        let mut samples: Vec<Sample> = Vec::new();
        collector.update(&mut samples).unwrap();

        let values: Vec<_> = samples.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![50.0, 60.0, 100.0, 40.0, 60.0, 1.0]);
        assert!(samples
            .iter()
            .all(|s| s.label("gpu_index") == Some("0") && s.label("gpu_name") == Some("A")));
    }

    #[test]
    fn test_utilization_failure_skips_device() {
        let library = FakeLibrary::new(vec![
            FakeDevice::new("A", 50, 60, memory(100, 40))
                .with_utilization_error(QueryError::NotSupported),
            FakeDevice::new("B", 10, 30, memory(200, 0)),
        ]);
        let collector = GpuCollector::with_library(library, "node", Span::none()).unwrap();

        let mut samples: Vec<Sample> = Vec::new();
        collector.update(&mut samples).unwrap();

        assert_eq!(samples.len(), 6);
        assert!(samples.iter().all(|s| s.label("gpu_name") == Some("B")));
    }

    #[test]
    fn test_memory_failure_skips_device() {
        let library = FakeLibrary::new(vec![
            FakeDevice::new("A", 50, 60, memory(100, 40)).with_memory_error(QueryError::GpuLost),
        ]);
        let collector = GpuCollector::with_library(library, "node", Span::none()).unwrap();

        let mut samples: Vec<Sample> = Vec::new();
        collector.update(&mut samples).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_sample_build_failure_skips_device() {
        let mut descs = GpuDescs::new("node").unwrap();
        descs.info = Arc::new(new_desc("node", "gpu", "info", "help", &["gpu_index"]).unwrap());
        let collector = GpuCollector {
            library: FakeLibrary::new(vec![
                FakeDevice::new("A", 50, 60, memory(100, 40)),
                FakeDevice::new("B", 10, 30, memory(200, 0)),
            ]),
            descs,
            logger: Span::none(),
        };

        let mut samples: Vec<Sample> = Vec::new();
        assert!(collector.update(&mut samples).is_ok());
        assert!(samples.is_empty());
    }

    /// Accepts a fixed number of samples, then reports the consumer as gone.
    struct LimitedSink {
        accepted: Vec<Sample>,
        limit: usize,
    }

    impl MetricSink for LimitedSink {
        fn emit(&mut self, sample: Sample) -> bool {
            if self.accepted.len() >= self.limit {
                return false;
            }
            self.accepted.push(sample);
            true
        }
    }

    #[test]
    fn test_closed_sink_stops_update() {
        let library = FakeLibrary::new(vec![
            FakeDevice::new("A", 50, 60, memory(100, 40)),
            FakeDevice::new("B", 10, 30, memory(200, 0)),
        ]);
        let collector = GpuCollector::with_library(library, "node", Span::none()).unwrap();

        let mut sink = LimitedSink {
            accepted: Vec::new(),
            limit: 3,
        };
        let result = collector.update(&mut sink);

        assert!(matches!(result, Err(CollectorError::SinkClosed)));
        assert_eq!(sink.accepted.len(), 3);
        assert!(sink.accepted.iter().all(|s| s.label("gpu_index") == Some("0")));
    }

    #[test]
    fn test_descs_cover_all_metrics() {
        let collector =
            GpuCollector::with_library(FakeLibrary::default(), "node", Span::none()).unwrap();
        let descs = collector.descs();

        assert_eq!(descs.len(), 6);
        assert!(descs
            .iter()
            .all(|d| d.variable_labels == vec!["gpu_index".to_string(), "gpu_name".to_string()]));
    }
}
