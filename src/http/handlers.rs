//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Successful `/favicon` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaviconResponse {
    pub favicon: String,
}

/// `/health` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// `GET /favicon?url=<target>`
pub async fn favicon_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<FaviconResponse>, ApiError> {
    let start = Instant::now();
    let result = resolve(&state, query.as_deref()).await;

    match &result {
        Ok(Json(body)) => {
            tracing::info!(favicon = %body.favicon, "Favicon request served");
            metrics::record_request("OK", start);
        }
        Err(err) => {
            log_rejection(err);
            metrics::record_request(err.code(), start);
        }
    }
    result
}

async fn resolve(state: &AppState, query: Option<&str>) -> Result<Json<FaviconResponse>, ApiError> {
    let target = query.and_then(target_param).ok_or(ApiError::MissingUrl)?;
    let favicon = state.resolver.resolve(&target).await?;
    Ok(Json(FaviconResponse { favicon }))
}

/// The first `url` value of the query string, if non-empty.
fn target_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn log_rejection(err: &ApiError) {
    let cause = std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default();

    if err.status().is_server_error() {
        tracing::error!(code = err.code(), cause = %cause, "Favicon request failed");
    } else {
        tracing::warn!(code = err.code(), cause = %cause, "Favicon request rejected");
    }
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> ApiError {
    ApiError::RouteNotFound
}
