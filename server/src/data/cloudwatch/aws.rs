//! aws-sdk-cloudwatch implementation of [`CloudWatchApi`]
//!
//! Credentials and region come from the standard AWS provider chain
//! (environment, profile, IMDS, ...). An explicit region or endpoint from the
//! exporter configuration overrides the chain.

use async_trait::async_trait;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{
    Dimension as AwsDimension, Metric as AwsMetric, MetricDataQuery, MetricStat, ScanBy,
};

use super::CloudWatchApi;
use super::error::CloudWatchError;
use super::types::{
    Dimension, GetMetricDataRequest, ListMetricsPage, ListMetricsRequest, MetricDataPage,
    MetricDataResult, MetricIdentity, MetricQuery,
};
use crate::core::config::AwsConfig;

const OP_LIST_METRICS: &str = "ListMetrics";
const OP_GET_METRIC_DATA: &str = "GetMetricData";

/// CloudWatch client backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsCloudWatch {
    client: Client,
}

impl AwsCloudWatch {
    /// Load AWS configuration and build the client
    pub async fn new(config: &AwsConfig) -> Self {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            config_loader =
                config_loader.region(aws_sdk_cloudwatch::config::Region::new(region.clone()));
        }

        // Custom endpoint for LocalStack and other CloudWatch-compatible services
        if let Some(endpoint) = &config.endpoint {
            config_loader = config_loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = config_loader.load().await;
        let client = Client::new(&sdk_config);

        tracing::debug!(
            region = ?sdk_config.region().map(|r| r.to_string()),
            endpoint = ?config.endpoint,
            "CloudWatch client initialized"
        );

        Self { client }
    }

    fn from_sdk_metric(metric: &AwsMetric) -> MetricIdentity {
        MetricIdentity {
            namespace: metric.namespace().unwrap_or_default().to_string(),
            name: metric.metric_name().unwrap_or_default().to_string(),
            dimensions: metric
                .dimensions()
                .iter()
                .map(|d| Dimension::new(d.name().unwrap_or_default(), d.value().unwrap_or_default()))
                .collect(),
        }
    }

    fn to_sdk_metric(identity: &MetricIdentity) -> AwsMetric {
        let dimensions = identity
            .dimensions
            .iter()
            .map(|d| AwsDimension::builder().name(&d.name).value(&d.value).build())
            .collect();

        AwsMetric::builder()
            .namespace(&identity.namespace)
            .metric_name(&identity.name)
            .set_dimensions(Some(dimensions))
            .build()
    }

    fn to_sdk_query(query: &MetricQuery) -> MetricDataQuery {
        let stat = MetricStat::builder()
            .metric(Self::to_sdk_metric(&query.identity))
            .period(query.period)
            .stat(&query.stat)
            .build();

        MetricDataQuery::builder()
            .id(&query.id)
            .metric_stat(stat)
            .return_data(true)
            .build()
    }
}

#[async_trait]
impl CloudWatchApi for AwsCloudWatch {
    async fn list_metrics(
        &self,
        request: ListMetricsRequest,
    ) -> Result<ListMetricsPage, CloudWatchError> {
        let output = self
            .client
            .list_metrics()
            .set_namespace(request.namespace)
            .set_metric_name(request.metric_name)
            .set_next_token(request.next_token)
            .send()
            .await
            .map_err(|e| CloudWatchError::sdk(OP_LIST_METRICS, DisplayErrorContext(&e).to_string()))?;

        Ok(ListMetricsPage {
            metrics: output.metrics().iter().map(Self::from_sdk_metric).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_metric_data(
        &self,
        request: GetMetricDataRequest,
    ) -> Result<MetricDataPage, CloudWatchError> {
        let queries = request.queries.iter().map(Self::to_sdk_query).collect();

        let output = self
            .client
            .get_metric_data()
            .set_metric_data_queries(Some(queries))
            .start_time(AwsDateTime::from_secs(request.start.timestamp()))
            .end_time(AwsDateTime::from_secs(request.end.timestamp()))
            .scan_by(ScanBy::TimestampDescending)
            .set_next_token(request.next_token)
            .send()
            .await
            .map_err(|e| {
                CloudWatchError::sdk(OP_GET_METRIC_DATA, DisplayErrorContext(&e).to_string())
            })?;

        let results = output
            .metric_data_results()
            .iter()
            .map(|r| MetricDataResult {
                id: r.id().map(str::to_string),
                values: r.values().to_vec(),
            })
            .collect();

        Ok(MetricDataPage {
            results,
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn name(&self) -> &'static str {
        "aws"
    }
}
