//! System endpoints: health check and chain catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// One supported network.
#[derive(Debug, Serialize, ToSchema)]
struct ChainInfo {
    chain_id: String,
    name: String,
    factory_address: String,
}

/// `GET /config/chains` — List supported chains.
#[utoipa::path(
    get,
    path = "/config/chains",
    tag = "System",
    summary = "List supported chains",
    description = "Returns every network the gateway will accept transactions from, with its pool factory address.",
    responses(
        (status = 200, description = "Chain catalog", body = Vec<ChainInfo>),
    )
)]
pub async fn chains_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut chains: Vec<ChainInfo> = state
        .registry
        .endpoints()
        .map(|endpoint| ChainInfo {
            chain_id: endpoint.chain_id.as_str().to_string(),
            name: endpoint.name.clone(),
            factory_address: endpoint.factory_address.as_str().to_string(),
        })
        .collect();
    chains.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
    (StatusCode::OK, Json(chains))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/chains", get(chains_handler))
}
