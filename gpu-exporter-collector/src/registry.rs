use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use prometheus::proto::MetricFamily;
use tracing::{debug, error, info, info_span};

use crate::collector::{Collector, CollectorContext, Registration};
use crate::config::ExporterConfig;
use crate::error::{CollectorError, Result};
use crate::metric::{gather, new_desc, Desc, MetricSink, Sample};

/// The set of collectors active in this process.
///
/// Built once at startup from an explicit registration list; each scrape runs
/// every collector in registration order. Register it with a
/// [`prometheus::Registry`] to serve it alongside other metrics.
pub struct CollectorRegistry {
    collectors: Vec<(&'static str, Box<dyn Collector>)>,
    duration_desc: Arc<Desc>,
    success_desc: Arc<Desc>,
}

impl CollectorRegistry {
    /// Construct every enabled collector in `registrations`.
    ///
    /// A collector whose construction fails is logged and left out; it does
    /// not prevent the others from being registered.
    pub fn new(registrations: Vec<Registration>, config: &ExporterConfig) -> Result<Self> {
        let mut seen = HashSet::new();
        for reg in &registrations {
            if !seen.insert(reg.name) {
                return Err(CollectorError::DuplicateCollector(reg.name.to_string()));
            }
        }

        let duration_desc = Arc::new(new_desc(
            &config.namespace,
            "scrape",
            "collector_duration_seconds",
            "Duration of a collector scrape.",
            &["collector"],
        )?);
        let success_desc = Arc::new(new_desc(
            &config.namespace,
            "scrape",
            "collector_success",
            "Whether a collector succeeded.",
            &["collector"],
        )?);

        let mut collectors = Vec::new();
        for reg in registrations {
            if !config.is_enabled(reg.name, reg.enabled_by_default) {
                debug!(collector = reg.name, "collector disabled");
                continue;
            }

            let ctx = CollectorContext {
                namespace: config.namespace.clone(),
                logger: info_span!("collector", collector = reg.name),
            };

            match (reg.factory)(ctx) {
                Ok(collector) => {
                    info!(collector = reg.name, "collector enabled");
                    collectors.push((reg.name, collector));
                }
                Err(e) => {
                    error!(collector = reg.name, error = %e, "failed to create collector");
                }
            }
        }

        Ok(Self {
            collectors,
            duration_desc,
            success_desc,
        })
    }

    /// Names of the collectors that were successfully constructed.
    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|(name, _)| *name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run one scrape over every collector.
    ///
    /// Each collector also gets a duration and a success sample. A failing
    /// collector is reported through its success sample and stays registered.
    /// The scrape stops with [`CollectorError::SinkClosed`] once `sink` stops
    /// accepting samples.
    pub fn scrape(&self, sink: &mut dyn MetricSink) -> Result<()> {
        for (name, collector) in &self.collectors {
            let start = Instant::now();
            let result = collector.update(sink);
            let elapsed = start.elapsed().as_secs_f64();

            let success = match result {
                Err(CollectorError::SinkClosed) => {
                    debug!(collector = *name, "scrape abandoned by consumer");
                    return Err(CollectorError::SinkClosed);
                }
                Ok(()) => {
                    debug!(collector = *name, duration_seconds = elapsed, "collector succeeded");
                    1.0
                }
                Err(e) => {
                    error!(collector = *name, duration_seconds = elapsed, error = %e, "collector failed");
                    0.0
                }
            };

            let labels = vec![name.to_string()];
            let duration = Sample::new(&self.duration_desc, elapsed, labels.clone())?;
            let outcome = Sample::new(&self.success_desc, success, labels)?;
            if !sink.emit(duration) || !sink.emit(outcome) {
                return Err(CollectorError::SinkClosed);
            }
        }

        Ok(())
    }
}

impl prometheus::core::Collector for CollectorRegistry {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = vec![self.duration_desc.as_ref(), self.success_desc.as_ref()];
        for (_, collector) in &self.collectors {
            descs.extend(collector.descs());
        }
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut samples: Vec<Sample> = Vec::new();
        if let Err(e) = self.scrape(&mut samples) {
            error!(error = %e, "scrape failed");
        }
        gather(&samples)
    }
}
