use std::sync::mpsc::Sender;
use std::sync::Arc;

use prometheus::core::Describer;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::Opts;

pub use prometheus::core::Desc;

use crate::error::{CollectorError, Result};

/// Build a descriptor named `<namespace>_<subsystem>_<name>`.
///
/// Empty parts are skipped. Metric and label names are validated by
/// `prometheus`.
pub fn new_desc(namespace: &str, subsystem: &str, name: &str, help: &str, labels: &[&str]) -> Result<Desc> {
    Opts::new(name, help)
        .namespace(namespace)
        .subsystem(subsystem)
        .variable_labels(labels.iter().map(|l| l.to_string()).collect())
        .describe()
        .map_err(|e| CollectorError::InvalidDescriptor(e.to_string()))
}

/// One gauge observation for a descriptor.
#[derive(Debug, Clone)]
pub struct Sample {
    desc: Arc<Desc>,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    /// Build a sample. The number of label values must match the descriptor.
    pub fn new(desc: &Arc<Desc>, value: f64, label_values: Vec<String>) -> Result<Self> {
        if label_values.len() != desc.variable_labels.len() {
            return Err(CollectorError::LabelCardinality {
                name: desc.fq_name.clone(),
                expected: desc.variable_labels.len(),
                actual: label_values.len(),
            });
        }

        Ok(Self {
            desc: Arc::clone(desc),
            value,
            label_values,
        })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Look up a label value by key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.desc
            .variable_labels
            .iter()
            .position(|name| name == key)
            .map(|i| self.label_values[i].as_str())
    }

    /// Convert into a protobuf gauge metric.
    pub fn to_metric(&self) -> Metric {
        let mut metric = Metric::default();
        for (name, value) in self.desc.variable_labels.iter().zip(&self.label_values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }

        let mut gauge = Gauge::default();
        gauge.set_value(self.value);
        metric.set_gauge(gauge);
        metric
    }
}

/// Group samples into gauge metric families, in first-seen name order.
pub fn gather(samples: &[Sample]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();

    for sample in samples {
        let index = match families.iter().position(|mf| mf.get_name() == sample.name()) {
            Some(index) => index,
            None => {
                let mut mf = MetricFamily::default();
                mf.set_name(sample.name().to_string());
                mf.set_help(sample.desc.help.clone());
                mf.set_field_type(MetricType::GAUGE);
                families.push(mf);
                families.len() - 1
            }
        };
        families[index].mut_metric().push(sample.to_metric());
    }

    families
}

/// Destination for samples produced during a scrape.
pub trait MetricSink {
    /// Hand over one sample. Returns `false` once the consumer is gone and
    /// further samples would be discarded.
    fn emit(&mut self, sample: Sample) -> bool;
}

impl MetricSink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) -> bool {
        self.push(sample);
        true
    }
}

impl MetricSink for Sender<Sample> {
    fn emit(&mut self, sample: Sample) -> bool {
        self.send(sample).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_desc() -> Arc<Desc> {
        Arc::new(new_desc("node", "gpu", "info", "help", &["gpu_index", "gpu_name"]).unwrap())
    }

    #[test]
    fn test_new_desc_names() {
        assert_eq!(info_desc().fq_name, "node_gpu_info");
        assert_eq!(new_desc("", "gpu", "info", "help", &[]).unwrap().fq_name, "gpu_info");
        assert_eq!(new_desc("node", "", "up", "help", &[]).unwrap().fq_name, "node_up");
    }

    #[test]
    fn test_new_desc_rejects_invalid_names() {
        assert!(matches!(
            new_desc("node-exporter", "gpu", "info", "help", &[]),
            Err(CollectorError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            new_desc("node", "gpu", "info", "help", &["gpu:index"]),
            Err(CollectorError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_sample_label_cardinality() {
        let desc = info_desc();

        let err = Sample::new(&desc, 1.0, vec!["0".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            CollectorError::LabelCardinality { expected: 2, actual: 1, .. }
        ));

        let sample = Sample::new(&desc, 1.0, vec!["0".to_string(), "A".to_string()]).unwrap();
        assert_eq!(sample.label("gpu_name"), Some("A"));
        assert_eq!(sample.label("missing"), None);

        let metric = sample.to_metric();
        let labels: Vec<_> = metric
            .get_label()
            .iter()
            .map(|p| (p.get_name(), p.get_value()))
            .collect();
        assert_eq!(labels, vec![("gpu_index", "0"), ("gpu_name", "A")]);
        assert_eq!(metric.get_gauge().get_value(), 1.0);
    }

    #[test]
    fn test_gather_groups_by_name() {
        let info = info_desc();
        let up = Arc::new(new_desc("node", "", "up", "Whether the exporter is up.", &[]).unwrap());

        let samples = vec![
            Sample::new(&info, 1.0, vec!["0".into(), "A".into()]).unwrap(),
            Sample::new(&up, 1.0, vec![]).unwrap(),
            Sample::new(&info, 1.0, vec!["1".into(), "B".into()]).unwrap(),
        ];

        let families = gather(&samples);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].get_name(), "node_gpu_info");
        assert_eq!(families[0].get_metric().len(), 2);
        assert_eq!(families[0].get_field_type(), MetricType::GAUGE);
        assert_eq!(families[1].get_name(), "node_up");
        assert_eq!(families[1].get_help(), "Whether the exporter is up.");
    }

    #[test]
    fn test_channel_sink() {
        let desc = Arc::new(new_desc("", "", "up", "help", &[]).unwrap());
        let (mut tx, rx) = std::sync::mpsc::channel();
        assert!(tx.emit(Sample::new(&desc, 1.0, Vec::new()).unwrap()));

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].value(), 1.0);

        drop(rx);
        assert!(!tx.emit(Sample::new(&desc, 1.0, Vec::new()).unwrap()));
    }
}
