use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::cache::{ONSEN_STATUS_ERROR, ONSEN_STATUS_HEADER, ONSEN_STATUS_NOT_READY};
use crate::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message, onsen_status) = match &self {
            GatewayError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                format!("invalid request: {reason}"),
                "invalid_request",
            ),
            GatewayError::Pipeline(PipelineError::InvalidInput { reason }) => (
                StatusCode::BAD_REQUEST,
                format!("invalid question: {reason}"),
                "invalid_request",
            ),
            GatewayError::Pipeline(PipelineError::NotReady) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "index is still loading, try again shortly".to_string(),
                ONSEN_STATUS_NOT_READY,
            ),
            GatewayError::Pipeline(PipelineError::Timeout { .. }) => (
                StatusCode::GATEWAY_TIMEOUT,
                "query timed out".to_string(),
                "timeout",
            ),
            GatewayError::Pipeline(e) => {
                error!(error = %e, "Query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    ONSEN_STATUS_ERROR,
                )
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(ONSEN_STATUS_HEADER, HeaderValue::from_static(onsen_status));

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
