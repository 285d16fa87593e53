use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cache::{CacheStatus, ONSEN_CACHE_HEADER, ONSEN_STATUS_HEADER, ONSEN_STATUS_READY};
use crate::constants::{DEFAULT_FINAL_K, MAX_SEARCH_K};
use crate::gateway::error::GatewayError;
use crate::gateway::state::GatewayState;
use crate::pipeline::HistoryTurn;
use crate::scoring::FinalResult;

/// Lowercase so it can be used with `HeaderName::from_static`.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PARTITION_HEADER: &str = "x-onsen-partition";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    pub question: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse<'a> {
    pub answer_sources: &'a FinalResult,
    pub response_time_ms: u64,
    pub partition: Option<&'a str>,
    pub carried_forward: bool,
}

const MALFORMED_BODY: &str = "malformed request body";

/// Decodes a request body. Decoder details are logged, never returned to the client.
fn parse_body<T: serde::de::DeserializeOwned>(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<T, GatewayError> {
    let Json(value) = body.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected request body");
        GatewayError::InvalidRequest(MALFORMED_BODY.to_string())
    })?;
    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Request body does not match schema");
        GatewayError::InvalidRequest(MALFORMED_BODY.to_string())
    })
}

fn response_headers(request_id: Uuid, cache: CacheStatus, partition: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ONSEN_STATUS_HEADER, HeaderValue::from_static(ONSEN_STATUS_READY));
    headers.insert(ONSEN_CACHE_HEADER, HeaderValue::from_static(cache.as_header_value()));
    if let Ok(id) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), id);
    }
    if let Some(Ok(value)) = partition.map(HeaderValue::from_str) {
        headers.insert(HeaderName::from_static(PARTITION_HEADER), value);
    }
    headers
}

#[instrument(skip(state, body), fields(request_id = tracing::field::Empty))]
pub async fn ask_handler(
    State(state): State<GatewayState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record("request_id", tracing::field::display(request_id));

    let request: AskRequest = parse_body(body)?;
    let outcome = state
        .service
        .ask(&request.question, request.history.as_deref())
        .await?;

    let response_time_ms = outcome.elapsed.as_millis() as u64;
    info!(
        partition = ?outcome.partition,
        cache = %outcome.cache,
        results = outcome.result.len(),
        response_time_ms,
        "Answered ask request"
    );

    let headers = response_headers(request_id, outcome.cache, outcome.partition.as_deref());
    let body = AskResponse {
        answer_sources: &outcome.result,
        response_time_ms,
        partition: outcome.partition.as_deref(),
        carried_forward: outcome.carried_forward,
    };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

#[instrument(skip(state, body), fields(request_id = tracing::field::Empty))]
pub async fn search_handler(
    State(state): State<GatewayState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let request_id = Uuid::new_v4();
    tracing::Span::current().record("request_id", tracing::field::display(request_id));

    let request: SearchRequest = parse_body(body)?;
    let k = request.k.unwrap_or(DEFAULT_FINAL_K);
    if k == 0 || k > MAX_SEARCH_K {
        return Err(GatewayError::InvalidRequest(format!(
            "k must be between 1 and {MAX_SEARCH_K}"
        )));
    }

    let outcome = state.service.search(&request.question, k).await?;
    info!(
        partition = ?outcome.partition,
        results = outcome.result.len(),
        response_time_ms = outcome.elapsed.as_millis() as u64,
        "Answered search request"
    );

    let headers = response_headers(request_id, CacheStatus::Bypass, outcome.partition.as_deref());
    Ok((StatusCode::OK, headers, Json(outcome.result.as_ref())).into_response())
}
