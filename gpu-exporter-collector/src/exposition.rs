//! Prometheus text exposition of scraped samples.

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};

pub use prometheus::TEXT_FORMAT as TEXT_CONTENT_TYPE;

use crate::error::Result;
use crate::metric::{gather, Sample};

/// Render metric families in the text format.
pub fn encode_families(families: &[MetricFamily]) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Render samples in the text format, one family per metric name.
pub fn encode_text(samples: &[Sample]) -> Result<String> {
    encode_families(&gather(samples))
}

/// Gather everything registered in `registry` and render it.
pub fn encode_registry(registry: &Registry) -> Result<String> {
    encode_families(&registry.gather())
}
