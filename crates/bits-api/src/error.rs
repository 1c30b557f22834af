//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Core error: {0}")]
    Core(#[from] bits_core::CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Core(e) => {
                // Upstream and parse failures are transient: ask the caller to retry
                let status = if e.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, e.code(), e.to_string())
            }
        };

        error!("Unable to serve bank endpoints: {}", message);
        metrics::counter!("bits_endpoints_errors_total", "code" => code).increment(1);

        let body = axum::Json(json!({
            "errors": [{
                "code": code,
                "message": message,
                "detail": "Banking endpoints are currently unavailable, try again later"
            }]
        }));

        (status, body).into_response()
    }
}
