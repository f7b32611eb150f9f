//! Process-wide exporter telemetry

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::api::types::ApiError;
use crate::core::constants::OPENMETRICS_CONTENT_TYPE;
use crate::domain::Telemetry;

pub fn routes(path: &str, telemetry: Arc<Telemetry>) -> Router {
    Router::new()
        .route(path, get(telemetry_metrics))
        .with_state(telemetry)
}

pub async fn telemetry_metrics(
    State(telemetry): State<Arc<Telemetry>>,
) -> Result<Response, ApiError> {
    let body = telemetry.encode().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode telemetry");
        ApiError::internal("Failed to encode telemetry")
    })?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response())
}
