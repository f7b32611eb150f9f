//! CloudWatch request and response types
//!
//! Backend-neutral shapes for the two upstream calls the exporter makes.
//! Each request/response pair covers exactly one page; pagination is driven
//! by the callers in `domain::exporter`.

use std::fmt;

use chrono::{DateTime, Utc};

/// A single (name, value) dimension of a time series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity of one upstream time series
///
/// Dimension order is kept exactly as the catalog returned it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    pub namespace: String,
    pub name: String,
    pub dimensions: Vec<Dimension>,
}

impl MetricIdentity {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            dimensions,
        }
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)?;
        for d in &self.dimensions {
            write!(f, " {}={}", d.name, d.value)?;
        }
        Ok(())
    }
}

/// One page request against the metric catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMetricsRequest {
    /// Exact namespace filter (None = all namespaces)
    pub namespace: Option<String>,
    /// Exact metric name filter (None = all names)
    pub metric_name: Option<String>,
    pub next_token: Option<String>,
}

/// One page of catalog results
#[derive(Debug, Clone, Default)]
pub struct ListMetricsPage {
    pub metrics: Vec<MetricIdentity>,
    pub next_token: Option<String>,
}

/// A single statistic query inside a GetMetricData request
#[derive(Debug, Clone)]
pub struct MetricQuery {
    /// Opaque identifier echoed back on the matching result
    pub id: String,
    pub identity: MetricIdentity,
    /// Aggregation period in seconds
    pub period: i32,
    /// Statistic name (e.g. "Maximum", "p99")
    pub stat: String,
}

/// One page request against the value query API
#[derive(Debug, Clone)]
pub struct GetMetricDataRequest {
    pub queries: Vec<MetricQuery>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub next_token: Option<String>,
}

/// Values returned for one query
///
/// Values are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricDataResult {
    pub id: Option<String>,
    pub values: Vec<f64>,
}

/// One page of value query results
#[derive(Debug, Clone, Default)]
pub struct MetricDataPage {
    pub results: Vec<MetricDataResult>,
    pub next_token: Option<String>,
}
