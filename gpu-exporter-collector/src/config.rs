use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Metric name prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "node";

/// Exporter-level configuration consumed by the collector registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Prefix for every emitted metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Per-collector enable overrides, keyed by collector name.
    /// Collectors not listed fall back to their registered default.
    #[serde(default)]
    pub collectors: BTreeMap<String, bool>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            collectors: BTreeMap::new(),
        }
    }
}

impl ExporterConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the named collector should be built.
    pub fn is_enabled(&self, name: &str, enabled_by_default: bool) -> bool {
        self.collectors
            .get(name)
            .copied()
            .unwrap_or(enabled_by_default)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}
