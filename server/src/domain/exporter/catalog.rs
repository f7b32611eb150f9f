//! Catalog discovery

use std::time::Instant;

use crate::data::cloudwatch::{CloudWatchApi, ListMetricsRequest, MetricIdentity};
use crate::domain::telemetry::Telemetry;

use super::error::CollectError;
use super::query::ScrapeQuery;

pub const API_CALL_LIST_METRICS: &str = "ListMetrics";

/// List every identity matching the query's namespace and name filters
///
/// Follows `next_token` until the catalog is exhausted. Identities are kept
/// in arrival order. The first failing page aborts the listing.
pub async fn list_metrics(
    api: &dyn CloudWatchApi,
    telemetry: &Telemetry,
    query: &ScrapeQuery,
) -> Result<Vec<MetricIdentity>, CollectError> {
    let mut identities = Vec::new();
    let mut next_token = None;
    let mut pages = 0usize;

    loop {
        let request = ListMetricsRequest {
            namespace: query.namespace_filter(),
            metric_name: query.name_filter(),
            next_token,
        };

        let started = Instant::now();
        let result = api.list_metrics(request).await;
        telemetry.observe_api_call(
            &query.namespace,
            &query.name,
            API_CALL_LIST_METRICS,
            started.elapsed(),
        );

        let page = result.map_err(|e| CollectError::catalog(&query.namespace, &query.name, e))?;
        pages += 1;
        identities.extend(page.metrics);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    tracing::debug!(
        namespace = %query.namespace,
        name = %query.name,
        pages,
        count = identities.len(),
        "Catalog listed"
    );
    Ok(identities)
}
