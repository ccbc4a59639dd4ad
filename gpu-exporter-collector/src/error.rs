use thiserror::Error;

/// Failure reported by a device-management library for a single query.
///
/// Backends translate their own return codes into this type so collectors
/// never depend on a particular vendor library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("library not initialized")]
    Uninitialized,

    #[error("operation not supported by this device")]
    NotSupported,

    #[error("insufficient permissions")]
    NoPermission,

    #[error("device not found")]
    NotFound,

    #[error("GPU has fallen off the bus or is otherwise inaccessible")]
    GpuLost,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("library error: {0}")]
    Library(String),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("could not initialise device library: {0}")]
    Initialization(QueryError),

    #[error("could not retrieve GPU count: {0}")]
    DeviceCount(QueryError),

    #[error("no GPUs found")]
    NoDevices,

    #[error("invalid metric descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("metric {name} expects {expected} label values, got {actual}")]
    LabelCardinality {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("metric consumer went away before the scrape finished")]
    SinkClosed,

    #[error("collector {0} registered more than once")]
    DuplicateCollector(String),

    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
