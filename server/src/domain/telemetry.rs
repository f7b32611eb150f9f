//! Process-wide exporter telemetry
//!
//! Counters and histograms about the exporter itself, created once at startup
//! and shared by `Arc`. Served on the telemetry listener, separate from the
//! CloudWatch data returned by scrapes.

use std::fmt;
use std::time::Duration;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Labels for whole-scrape durations
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub namespace: String,
    pub name: String,
}

/// Labels for single upstream call durations
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ApiCallLabels {
    pub namespace: String,
    pub name: String,
    pub api_call: String,
}

pub struct Telemetry {
    registry: Registry,
    errors: Counter,
    metrics_sent: Counter,
    request_duration: Family<RequestLabels, Histogram>,
    api_call_duration: Family<ApiCallLabels, Histogram>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("errors", &self.errors.get())
            .field("metrics_sent", &self.metrics_sent.get())
            .finish()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // Counters are registered without the `_total` suffix; the encoder adds it
        let errors = Counter::default();
        registry.register(
            "cloudwatch_errors",
            "Number of errors signalled while collecting CloudWatch metrics",
            errors.clone(),
        );

        let metrics_sent = Counter::default();
        registry.register(
            "cloudwatch_metrics_sent",
            "Number of CloudWatch values exposed since startup",
            metrics_sent.clone(),
        );

        let request_duration =
            Family::<RequestLabels, Histogram>::new_with_constructor(duration_histogram);
        registry.register(
            "cloudwatch_request_duration_seconds",
            "Duration of a full scrape",
            request_duration.clone(),
        );

        let api_call_duration =
            Family::<ApiCallLabels, Histogram>::new_with_constructor(duration_histogram);
        registry.register(
            "cloudwatch_api_call_duration_seconds",
            "Duration of a single CloudWatch API call",
            api_call_duration.clone(),
        );

        Self {
            registry,
            errors,
            metrics_sent,
            request_duration,
            api_call_duration,
        }
    }

    pub fn record_error(&self) {
        self.errors.inc();
    }

    pub fn record_sent(&self, count: u64) {
        self.metrics_sent.inc_by(count);
    }

    pub fn observe_request(&self, namespace: &str, name: &str, elapsed: Duration) {
        self.request_duration
            .get_or_create(&RequestLabels {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_api_call(&self, namespace: &str, name: &str, api_call: &str, elapsed: Duration) {
        self.api_call_duration
            .get_or_create(&ApiCallLabels {
                namespace: namespace.to_string(),
                name: name.to_string(),
                api_call: api_call.to_string(),
            })
            .observe(elapsed.as_secs_f64());
    }

    pub fn errors(&self) -> u64 {
        self.errors.get()
    }

    pub fn metrics_sent(&self) -> u64 {
        self.metrics_sent.get()
    }

    /// Render the registry in OpenMetrics text format
    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

/// 5ms .. ~20s
fn duration_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}
