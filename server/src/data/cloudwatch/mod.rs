//! CloudWatch API boundary
//!
//! The exporter talks to CloudWatch through the [`CloudWatchApi`] trait so the
//! collection pipeline can run against the real SDK or an in-memory catalog.
//!
//! - `aws` - aws-sdk-cloudwatch implementation
//! - `memory` - in-memory catalog used by tests
//! - `types` - request/response shapes
//! - `error` - error type for upstream calls

pub mod aws;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use aws::AwsCloudWatch;
pub use error::CloudWatchError;
pub use types::{
    Dimension, GetMetricDataRequest, ListMetricsPage, ListMetricsRequest, MetricDataPage,
    MetricDataResult, MetricIdentity, MetricQuery,
};

/// Upstream metrics catalog and value query API
///
/// Every call fetches exactly one page. Implementations must be thread-safe
/// since batches are fetched from concurrently running tasks.
#[async_trait]
pub trait CloudWatchApi: Send + Sync {
    /// Fetch one page of the metric catalog
    async fn list_metrics(
        &self,
        request: ListMetricsRequest,
    ) -> Result<ListMetricsPage, CloudWatchError>;

    /// Fetch one page of values for a set of queries
    ///
    /// Results are not guaranteed to arrive in query order.
    async fn get_metric_data(
        &self,
        request: GetMetricDataRequest,
    ) -> Result<MetricDataPage, CloudWatchError>;

    /// Human-readable backend name
    fn name(&self) -> &'static str;
}
