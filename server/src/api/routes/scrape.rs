//! CloudWatch scrape endpoint
//!
//! `GET {metrics_path}<namespace...>/<metric name>?delay=&range=&period=&stat=`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::api::types::ApiError;
use crate::core::config::{OnError, QueryConfig};
use crate::core::constants::OPENMETRICS_CONTENT_TYPE;
use crate::domain::exporter::{Exporter, ScrapeQuery, exposition};

#[derive(Clone)]
pub struct ScrapeState {
    pub exporter: Arc<Exporter>,
    pub defaults: QueryConfig,
    pub on_error: OnError,
}

/// Scrape routes rooted at `metrics_path` (starts and ends with `/`)
pub fn routes(metrics_path: &str, state: ScrapeState) -> Router {
    Router::new()
        .route(metrics_path, get(scrape_root))
        .route(&format!("{}{{*path}}", metrics_path), get(scrape))
        .with_state(state)
}

pub async fn scrape(
    State(state): State<ScrapeState>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    run_scrape(&state, &path, &params).await
}

/// The bare prefix names neither a namespace nor a metric
pub async fn scrape_root(
    State(state): State<ScrapeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    run_scrape(&state, "", &params).await
}

async fn run_scrape(
    state: &ScrapeState,
    path: &str,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let telemetry = state.exporter.telemetry();

    let query = ScrapeQuery::parse(path, params, &state.defaults).map_err(|e| {
        tracing::debug!(path, error = %e, "Rejected scrape request");
        telemetry.record_error();
        ApiError::from(e)
    })?;

    let namespace = query.namespace.clone();
    let name = query.name.clone();
    tracing::debug!(
        namespace = %namespace,
        name = %name,
        stat = %query.stat.stat,
        period = query.stat.period,
        "Scrape started"
    );

    let result = state.exporter.collect_all(query).await;
    telemetry.observe_request(&namespace, &name, started.elapsed());

    tracing::info!(
        namespace = %namespace,
        name = %name,
        sent = result.sent,
        errors = result.errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Scrape finished"
    );

    if state.on_error == OnError::Fail && !result.errors.is_empty() {
        let message = result
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ApiError::internal(message));
    }

    let body = exposition::render(result).map_err(|e| {
        tracing::error!(error = %e, "Failed to encode scrape");
        ApiError::internal("Failed to encode metrics")
    })?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response())
}
