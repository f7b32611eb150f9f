//! Shared API types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::exporter::QueryError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        let code = match e {
            QueryError::MissingNamespace => "NAMESPACE_REQUIRED",
            QueryError::MissingMetricName => "METRIC_NAME_REQUIRED",
            QueryError::InvalidNumber { .. } => "INVALID_NUMBER",
            QueryError::NonPositive { .. } => "NON_POSITIVE",
            QueryError::UnknownStatistic(_) => "UNKNOWN_STATISTIC",
        };
        Self::bad_request(code, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_maps_to_bad_request() {
        match ApiError::from(QueryError::MissingNamespace) {
            ApiError::BadRequest { code, message } => {
                assert_eq!(code, "NAMESPACE_REQUIRED");
                assert_eq!(message, "Namespace required");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match ApiError::from(QueryError::UnknownStatistic("Median".to_string())) {
            ApiError::BadRequest { code, .. } => assert_eq!(code, "UNKNOWN_STATISTIC"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("X", "bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("NOT_FOUND", "gone").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
