use super::{DeviceHandle, DeviceLibrary, MemoryInfo};
use crate::error::{QueryError, QueryResult};

/// Scripted device for [`FakeLibrary`]. Each reading is either a value or the
/// failure the query should report.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub handle: QueryResult<()>,
    pub name: QueryResult<String>,
    pub utilization: QueryResult<u32>,
    pub temperature: QueryResult<u32>,
    pub memory: QueryResult<MemoryInfo>,
}

impl FakeDevice {
    pub fn new(name: &str, utilization: u32, temperature: u32, memory: MemoryInfo) -> Self {
        Self {
            handle: Ok(()),
            name: Ok(name.to_string()),
            utilization: Ok(utilization),
            temperature: Ok(temperature),
            memory: Ok(memory),
        }
    }

    pub fn with_handle_error(mut self, err: QueryError) -> Self {
        self.handle = Err(err);
        self
    }

    pub fn with_name_error(mut self, err: QueryError) -> Self {
        self.name = Err(err);
        self
    }

    pub fn with_utilization_error(mut self, err: QueryError) -> Self {
        self.utilization = Err(err);
        self
    }

    pub fn with_temperature_error(mut self, err: QueryError) -> Self {
        self.temperature = Err(err);
        self
    }

    pub fn with_memory_error(mut self, err: QueryError) -> Self {
        self.memory = Err(err);
        self
    }
}

/// In-memory device library used in tests and demos in place of NVML.
#[derive(Debug, Clone, Default)]
pub struct FakeLibrary {
    devices: Vec<FakeDevice>,
    count_error: Option<QueryError>,
}

impl FakeLibrary {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices,
            count_error: None,
        }
    }

    /// A library whose device count query always fails.
    pub fn failing(err: QueryError) -> Self {
        Self {
            devices: Vec::new(),
            count_error: Some(err),
        }
    }
}

impl DeviceLibrary for FakeLibrary {
    fn device_count(&self) -> QueryResult<u32> {
        match &self.count_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.devices.len() as u32),
        }
    }

    fn device_by_index(&self, index: u32) -> QueryResult<Box<dyn DeviceHandle + '_>> {
        let device = self
            .devices
            .get(index as usize)
            .ok_or_else(|| QueryError::InvalidArgument(format!("device index {} out of range", index)))?;
        device.handle.clone()?;
        Ok(Box::new(device))
    }
}

impl DeviceHandle for &FakeDevice {
    fn name(&self) -> QueryResult<String> {
        self.name.clone()
    }

    fn utilization(&self) -> QueryResult<u32> {
        self.utilization.clone()
    }

    fn temperature(&self) -> QueryResult<u32> {
        self.temperature.clone()
    }

    fn memory_info(&self) -> QueryResult<MemoryInfo> {
        self.memory.clone()
    }
}
