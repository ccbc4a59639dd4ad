use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{Device as NvmlDevice, Nvml};
use tracing::info;

use super::{DeviceHandle, DeviceLibrary, MemoryInfo};
use crate::error::{QueryError, QueryResult};

impl From<NvmlError> for QueryError {
    fn from(err: NvmlError) -> Self {
        match err {
            NvmlError::Uninitialized => QueryError::Uninitialized,
            NvmlError::NotSupported => QueryError::NotSupported,
            NvmlError::NoPermission => QueryError::NoPermission,
            NvmlError::NotFound => QueryError::NotFound,
            NvmlError::GpuLost => QueryError::GpuLost,
            NvmlError::InvalidArg => QueryError::InvalidArgument("rejected by NVML".to_string()),
            other => QueryError::Library(other.to_string()),
        }
    }
}

/// NVML-backed device library.
///
/// The NVML session is opened once and shut down when this value is dropped.
pub struct NvmlLibrary {
    nvml: Nvml,
}

impl NvmlLibrary {
    /// Load and initialise NVML.
    pub fn init() -> QueryResult<Self> {
        info!("Initializing NVML for GPU monitoring");

        let nvml = Nvml::init()?;

        if let Ok(version) = nvml.sys_driver_version() {
            info!(driver_version = %version, "NVML initialized");
        }

        Ok(Self { nvml })
    }
}

impl DeviceLibrary for NvmlLibrary {
    fn device_count(&self) -> QueryResult<u32> {
        Ok(self.nvml.device_count()?)
    }

    fn device_by_index(&self, index: u32) -> QueryResult<Box<dyn DeviceHandle + '_>> {
        let device = self.nvml.device_by_index(index)?;
        Ok(Box::new(NvmlHandle { device }))
    }
}

struct NvmlHandle<'nvml> {
    device: NvmlDevice<'nvml>,
}

impl DeviceHandle for NvmlHandle<'_> {
    fn name(&self) -> QueryResult<String> {
        Ok(self.device.name()?)
    }

    fn utilization(&self) -> QueryResult<u32> {
        Ok(self.device.utilization_rates()?.gpu)
    }

    fn temperature(&self) -> QueryResult<u32> {
        Ok(self.device.temperature(TemperatureSensor::Gpu)?)
    }

    fn memory_info(&self) -> QueryResult<MemoryInfo> {
        let mem = self.device.memory_info()?;
        Ok(MemoryInfo {
            total: mem.total,
            used: mem.used,
            free: mem.free,
        })
    }
}
