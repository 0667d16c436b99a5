//! Operational HTTP handlers for the MCP instance pool

use crate::mcp::cache::CacheStats;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub instances: CacheStats,
}

/// GET /health - liveness plus instance cache statistics
///
/// Unauthenticated. Reading the stats does not change any entry's recency.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instances: state.dispatcher.registry().stats(),
    })
}
