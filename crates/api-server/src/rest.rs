//! Operational REST endpoints: health, readiness, and liveness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;

/// Shared operational state for probe handlers.
#[derive(Clone)]
pub struct OpsState {
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<OpsState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe for Kubernetes.
pub async fn readiness(State(state): State<OpsState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
