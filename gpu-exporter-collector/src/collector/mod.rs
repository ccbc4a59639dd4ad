pub mod gpu;

pub use gpu::GpuCollector;

use tracing::Span;

use crate::error::Result;
use crate::metric::{Desc, MetricSink};

/// A named source of samples, invoked once per scrape.
pub trait Collector: Send + Sync {
    /// Descriptors of every metric this collector can emit.
    fn descs(&self) -> Vec<&Desc>;

    /// Read current values and write them to `sink`.
    ///
    /// An error fails this collector for the current scrape only.
    fn update(&self, sink: &mut dyn MetricSink) -> Result<()>;
}

/// Everything a collector receives when it is constructed.
#[derive(Debug, Clone)]
pub struct CollectorContext {
    /// Prefix for every metric name the collector emits.
    pub namespace: String,

    /// Span the collector records its log events in.
    pub logger: Span,
}

pub type CollectorFactory = fn(CollectorContext) -> Result<Box<dyn Collector>>;

/// Entry in the list of collectors an exporter may build at startup.
#[derive(Clone, Copy)]
pub struct Registration {
    pub name: &'static str,
    pub enabled_by_default: bool,
    pub factory: CollectorFactory,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("enabled_by_default", &self.enabled_by_default)
            .finish_non_exhaustive()
    }
}

/// Collectors compiled into this build.
pub fn registrations() -> Vec<Registration> {
    #[allow(unused_mut)]
    let mut list = Vec::new();

    #[cfg(feature = "nvml")]
    list.push(Registration {
        name: gpu::COLLECTOR_NAME,
        enabled_by_default: true,
        factory: gpu::new_nvml_collector,
    });

    list
}
