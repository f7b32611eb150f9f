//! In-memory CloudWatch catalog
//!
//! Paginates like the real service (catalog pages of 500, value pages of a
//! configurable size), returns value results in reverse query order, and can
//! be told to fail in specific ways.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::CloudWatchApi;
use super::error::CloudWatchError;
use super::types::{
    Dimension, GetMetricDataRequest, ListMetricsPage, ListMetricsRequest, MetricDataPage,
    MetricDataResult, MetricIdentity,
};

const LIST_PAGE_SIZE: usize = 500;
const DATA_PAGE_SIZE: usize = 100;
const DEFAULT_VALUE: f64 = 23.42;

#[derive(Debug, Default)]
pub struct MemoryCloudWatch {
    metrics: RwLock<Vec<MetricIdentity>>,
    values: RwLock<HashMap<MetricIdentity, Vec<f64>>>,
    latency: Option<Duration>,
    fail_list: AtomicBool,
    fail_values_for: RwLock<Option<String>>,
    drop_result: AtomicBool,
    list_calls: AtomicUsize,
    data_calls: AtomicUsize,
    max_queries_per_call: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryCloudWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every value call, so concurrent batches overlap
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn insert(&self, identity: MetricIdentity, values: Vec<f64>) {
        self.values.write().insert(identity.clone(), values);
        self.metrics.write().push(identity);
    }

    /// Insert `count` series that differ only in their `InstanceId` dimension
    pub fn insert_random(&self, namespace: &str, name: &str, count: usize) {
        for i in 0..count {
            let identity = MetricIdentity::new(
                namespace,
                name,
                vec![Dimension::new("InstanceId", format!("i-{:05}", i))],
            );
            self.insert(identity, vec![DEFAULT_VALUE, 1.0]);
        }
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    /// Fail every value call whose queries include a series with this dimension value
    pub fn fail_values_for(&self, dimension_value: &str) {
        *self.fail_values_for.write() = Some(dimension_value.to_string());
    }

    /// Omit one result from the last page of every value call
    pub fn drop_result(&self) {
        self.drop_result.store(true, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }

    pub fn max_queries_per_call(&self) -> usize {
        self.max_queries_per_call.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn parse_token(token: Option<&str>) -> Result<usize, CloudWatchError> {
        match token {
            None => Ok(0),
            Some(t) => t
                .parse()
                .map_err(|_| CloudWatchError::invalid_request(format!("bad next token: {t}"))),
        }
    }

    async fn fetch_values(
        &self,
        request: GetMetricDataRequest,
    ) -> Result<MetricDataPage, CloudWatchError> {
        if request.queries.is_empty() {
            return Err(CloudWatchError::invalid_request(
                "MetricDataQueries must not be empty",
            ));
        }
        self.max_queries_per_call
            .fetch_max(request.queries.len(), Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(trigger) = self.fail_values_for.read().as_deref()
            && request
                .queries
                .iter()
                .any(|q| q.identity.dimensions.iter().any(|d| d.value == trigger))
        {
            return Err(CloudWatchError::sdk("GetMetricData", "injected failure"));
        }

        let start = Self::parse_token(request.next_token.as_deref())?;
        let end = (start + DATA_PAGE_SIZE).min(request.queries.len());
        let is_last = end >= request.queries.len();

        let values = self.values.read();
        let mut results: Vec<MetricDataResult> = request.queries[start..end]
            .iter()
            .map(|q| MetricDataResult {
                id: Some(q.id.clone()),
                values: values.get(&q.identity).cloned().unwrap_or_default(),
            })
            .collect();
        results.reverse();

        if is_last && self.drop_result.load(Ordering::SeqCst) {
            results.pop();
        }

        Ok(MetricDataPage {
            results,
            next_token: (!is_last).then(|| end.to_string()),
        })
    }
}

#[async_trait]
impl CloudWatchApi for MemoryCloudWatch {
    async fn list_metrics(
        &self,
        request: ListMetricsRequest,
    ) -> Result<ListMetricsPage, CloudWatchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(CloudWatchError::sdk("ListMetrics", "injected failure"));
        }

        let start = Self::parse_token(request.next_token.as_deref())?;
        let matching: Vec<MetricIdentity> = self
            .metrics
            .read()
            .iter()
            .filter(|m| request.namespace.as_ref().is_none_or(|ns| &m.namespace == ns))
            .filter(|m| request.metric_name.as_ref().is_none_or(|n| &m.name == n))
            .cloned()
            .collect();

        let start = start.min(matching.len());
        let end = (start + LIST_PAGE_SIZE).min(matching.len());
        Ok(ListMetricsPage {
            metrics: matching[start..end].to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn get_metric_data(
        &self,
        request: GetMetricDataRequest,
    ) -> Result<MetricDataPage, CloudWatchError> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.fetch_values(request).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cloudwatch::MetricQuery;
    use chrono::Utc;

    fn queries_for(metrics: &[MetricIdentity]) -> Vec<MetricQuery> {
        metrics
            .iter()
            .enumerate()
            .map(|(i, m)| MetricQuery {
                id: format!("n{}", i),
                identity: m.clone(),
                period: 60,
                stat: "Maximum".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_list_empty() {
        let cw = MemoryCloudWatch::new();
        let page = cw
            .list_metrics(ListMetricsRequest {
                namespace: Some("AWS/EC2".to_string()),
                metric_name: Some("NetworkIn".to_string()),
                next_token: None,
            })
            .await
            .unwrap();
        assert!(page.metrics.is_empty());
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_paginates_at_500() {
        let cw = MemoryCloudWatch::new();
        cw.insert_random("AWS/EC2", "NetworkIn", 567);

        let first = cw
            .list_metrics(ListMetricsRequest {
                namespace: Some("AWS/EC2".to_string()),
                metric_name: Some("NetworkIn".to_string()),
                next_token: None,
            })
            .await
            .unwrap();
        assert_eq!(first.metrics.len(), 500);
        assert_eq!(first.next_token.as_deref(), Some("500"));

        let second = cw
            .list_metrics(ListMetricsRequest {
                namespace: Some("AWS/EC2".to_string()),
                metric_name: Some("NetworkIn".to_string()),
                next_token: first.next_token,
            })
            .await
            .unwrap();
        assert_eq!(second.metrics.len(), 67);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_get_metric_data_pages_and_reverses() {
        let cw = MemoryCloudWatch::new();
        cw.insert_random("AWS/EC2", "NetworkIn", 150);
        let metrics = cw.metrics.read().clone();

        let page = cw
            .get_metric_data(GetMetricDataRequest {
                queries: queries_for(&metrics),
                start: Utc::now(),
                end: Utc::now(),
                next_token: None,
            })
            .await
            .unwrap();

        assert_eq!(page.results.len(), DATA_PAGE_SIZE);
        assert_eq!(page.results[0].id.as_deref(), Some("n99"));
        assert_eq!(page.next_token.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn test_get_metric_data_rejects_empty_queries() {
        let cw = MemoryCloudWatch::new();
        let err = cw
            .get_metric_data(GetMetricDataRequest {
                queries: Vec::new(),
                start: Utc::now(),
                end: Utc::now(),
                next_token: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudWatchError::InvalidRequest(_)));
    }
}
