//! OpenMetrics rendering of a scrape

use std::collections::BTreeMap;
use std::fmt;

use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::registry::Registry;

use super::collector::{ScrapeResult, ValueSample};

pub const METRICS_SENT_NAME: &str = "aws_metrics_sent";
pub const METRICS_SENT_HELP: &str = "Number of metrics sent in this scrape";
pub const SCRAPE_ERRORS_NAME: &str = "cloudwatch_scrape_errors";
pub const SCRAPE_ERRORS_HELP: &str = "Number of errors signalled in this scrape";

/// Collector over the samples of one finished scrape
///
/// Series that share an exposed name are written as one family even when
/// their label sets differ.
#[derive(Debug)]
pub struct ScrapeCollector {
    values: Vec<ValueSample>,
    sent: u64,
    errors: usize,
}

impl ScrapeCollector {
    pub fn new(result: ScrapeResult) -> Self {
        Self {
            values: result.values,
            sent: result.sent,
            errors: result.errors.len(),
        }
    }
}

impl Collector for ScrapeCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let mut families: BTreeMap<&str, Vec<&ValueSample>> = BTreeMap::new();
        for sample in &self.values {
            families
                .entry(sample.descriptor.name.as_str())
                .or_default()
                .push(sample);
        }

        for (name, samples) in families {
            let help = samples
                .first()
                .map(|s| s.descriptor.help.as_str())
                .unwrap_or_default();
            let mut metric_encoder = encoder.encode_descriptor(name, help, None, MetricType::Gauge)?;

            for sample in samples {
                let labels: Vec<(String, String)> = sample
                    .descriptor
                    .label_names
                    .iter()
                    .cloned()
                    .zip(sample.label_values.iter().cloned())
                    .collect();
                let family_encoder = metric_encoder.encode_family(&labels)?;
                ConstGauge::new(sample.value).encode(family_encoder)?;
            }
        }

        let sent = ConstGauge::new(self.sent as i64);
        let metric_encoder = encoder.encode_descriptor(
            METRICS_SENT_NAME,
            METRICS_SENT_HELP,
            None,
            sent.metric_type(),
        )?;
        sent.encode(metric_encoder)?;

        let errors = ConstGauge::new(self.errors as i64);
        let metric_encoder = encoder.encode_descriptor(
            SCRAPE_ERRORS_NAME,
            SCRAPE_ERRORS_HELP,
            None,
            errors.metric_type(),
        )?;
        errors.encode(metric_encoder)?;

        Ok(())
    }
}

/// Render a finished scrape as OpenMetrics text
pub fn render(result: ScrapeResult) -> Result<String, fmt::Error> {
    let mut registry = Registry::default();
    registry.register_collector(Box::new(ScrapeCollector::new(result)));

    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &registry)?;
    Ok(buffer)
}
