//! HTTP gateway (Axum) in front of [`RagService`](crate::pipeline::RagService).

pub mod error;
pub mod handler;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{AskRequest, SearchRequest, ask_handler, search_handler};
pub use state::GatewayState;

use crate::cache::{
    ONSEN_STATUS_HEADER, ONSEN_STATUS_HEALTHY, ONSEN_STATUS_NOT_READY, ONSEN_STATUS_READY,
};

pub fn create_router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/health", get(status_handler))
        .route("/api/ask", post(ask_handler))
        .route("/api/search", post(search_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub index_ready: bool,
    pub passages: usize,
    pub partitions: Vec<String>,
}

/// Liveness only.
#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        ONSEN_STATUS_HEADER,
        HeaderValue::from_static(ONSEN_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Index readiness; 503 until the first index is active.
#[tracing::instrument(skip(state))]
pub async fn status_handler(State(state): State<GatewayState>) -> Response {
    let summary = state.service.summary();
    let index_ready = summary.is_some();
    let (passages, partitions) = summary
        .map(|s| (s.passages, s.partitions))
        .unwrap_or_default();

    let (status_code, status) = if index_ready {
        (StatusCode::OK, ONSEN_STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ONSEN_STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(ONSEN_STATUS_HEADER, HeaderValue::from_static(status));

    (
        status_code,
        headers,
        Json(StatusResponse {
            status,
            index_ready,
            passages,
            partitions,
        }),
    )
        .into_response()
}
