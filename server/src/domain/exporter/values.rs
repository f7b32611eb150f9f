//! Batched value retrieval
//!
//! Every identity of a batch becomes one query whose id encodes its position
//! in the batch. Upstream may return results in any order, so the id is the
//! only link between a result and its identity.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;

use crate::core::constants::CLOUDWATCH_MAX_QUERIES_PER_REQUEST;
use crate::data::cloudwatch::{CloudWatchApi, GetMetricDataRequest, MetricIdentity, MetricQuery};
use crate::domain::telemetry::Telemetry;

use super::error::CollectError;
use super::query::{QueryWindow, ScrapeQuery};

pub const API_CALL_GET_METRIC_DATA: &str = "GetMetricData";

const QUERY_ID_PREFIX: char = 'n';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryIdError {
    #[error("result has no id")]
    Missing,

    #[error("{0:?} does not start with 'n'")]
    MissingPrefix(String),

    #[error("{0:?} does not encode a batch index")]
    InvalidIndex(String),

    #[error("index {index} is outside a batch of {size}")]
    OutOfRange { index: usize, size: usize },
}

/// Batch-local query identifier, rendered as `n<index>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(usize);

impl QueryId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", QUERY_ID_PREFIX, self.0)
    }
}

impl FromStr for QueryId {
    type Err = QueryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(QUERY_ID_PREFIX)
            .ok_or_else(|| QueryIdError::MissingPrefix(s.to_string()))?;

        // Only the canonical form produced by Display is accepted
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return Err(QueryIdError::InvalidIndex(s.to_string()));
        }
        digits
            .parse()
            .map(Self)
            .map_err(|_| QueryIdError::InvalidIndex(s.to_string()))
    }
}

/// Values for one batch position, newest first
pub type BatchValues = Vec<(usize, Vec<f64>)>;

/// Fetch values for one batch of identities
///
/// Returns one entry per identity, keyed by its position in `batch` and
/// sorted by position. Entries may hold zero values.
pub async fn get_values(
    api: &dyn CloudWatchApi,
    telemetry: &Telemetry,
    query: &ScrapeQuery,
    window: QueryWindow,
    batch_index: usize,
    batch: &[MetricIdentity],
) -> Result<BatchValues, CollectError> {
    if batch.is_empty() {
        return Err(CollectError::EmptyBatch);
    }
    if batch.len() > CLOUDWATCH_MAX_QUERIES_PER_REQUEST {
        return Err(CollectError::BatchTooLarge {
            size: batch.len(),
            max: CLOUDWATCH_MAX_QUERIES_PER_REQUEST,
        });
    }

    let stat = query.stat.stat.to_string();
    let queries: Vec<MetricQuery> = batch
        .iter()
        .enumerate()
        .map(|(i, identity)| MetricQuery {
            id: QueryId::new(i).to_string(),
            identity: identity.clone(),
            period: query.stat.period,
            stat: stat.clone(),
        })
        .collect();

    let mut results = Vec::with_capacity(batch.len());
    let mut next_token = None;
    loop {
        let request = GetMetricDataRequest {
            queries: queries.clone(),
            start: window.start,
            end: window.end,
            next_token,
        };

        let started = Instant::now();
        let page = api.get_metric_data(request).await;
        telemetry.observe_api_call(
            &query.namespace,
            &query.name,
            API_CALL_GET_METRIC_DATA,
            started.elapsed(),
        );

        let page = page.map_err(|source| CollectError::Batch {
            batch: batch_index,
            source,
        })?;
        results.extend(page.results);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    if results.len() != batch.len() {
        return Err(CollectError::ResultCountMismatch {
            expected: batch.len(),
            actual: results.len(),
        });
    }

    let mut seen = vec![false; batch.len()];
    let mut values = Vec::with_capacity(batch.len());
    for result in results {
        let id: QueryId = result.id.as_deref().ok_or(QueryIdError::Missing)?.parse()?;
        let index = id.index();
        if index >= batch.len() {
            return Err(QueryIdError::OutOfRange {
                index,
                size: batch.len(),
            }
            .into());
        }
        if seen[index] {
            return Err(CollectError::DuplicateQueryId(index));
        }
        seen[index] = true;
        values.push((index, result.values));
    }
    values.sort_by_key(|(index, _)| *index);

    Ok(values)
}
