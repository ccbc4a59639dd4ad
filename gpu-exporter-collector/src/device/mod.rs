pub mod fake;
#[cfg(feature = "nvml")]
pub mod nvml;

pub use fake::{FakeDevice, FakeLibrary};
#[cfg(feature = "nvml")]
pub use nvml::NvmlLibrary;

use crate::error::QueryResult;

/// Memory usage of a device, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Read access to one enumerated device.
pub trait DeviceHandle {
    fn name(&self) -> QueryResult<String>;

    /// GPU utilisation over the last sample period, in percent.
    fn utilization(&self) -> QueryResult<u32>;

    /// GPU die temperature in degrees Celsius.
    fn temperature(&self) -> QueryResult<u32>;

    fn memory_info(&self) -> QueryResult<MemoryInfo>;
}

/// Device enumeration capability of a device-management library.
pub trait DeviceLibrary: Send + Sync {
    fn device_count(&self) -> QueryResult<u32>;

    fn device_by_index(&self, index: u32) -> QueryResult<Box<dyn DeviceHandle + '_>>;
}
