use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures raised inside the HRP pipeline.
///
/// The `Display` text is what the caller sees in `OptimizationResult::Error`,
/// so every message should say what went wrong in plain words.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Clustering failed: {0}")]
    Clustering(String),
    #[error("Allocation failed: {0}")]
    Allocation(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    /// Pipeline failures, including market data that could not be fetched.
    #[error("{0}")]
    Optimization(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let msg = match self {
            AppError::Validation(msg) | AppError::Optimization(msg) => msg,
        };
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": msg }))).into_response()
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn test_unavailable_data_maps_to_bad_request() {
        let message = OptimizationError::DataUnavailable("no prices for ZZZZ".to_string()).to_string();
        let response = AppError::Optimization(message).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Market data unavailable: no prices for ZZZZ");
    }

    #[test]
    fn test_string_converts_to_validation() {
        let err: AppError = "Invalid date 'x'".to_string().into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
