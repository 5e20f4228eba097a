//! Health Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// Detailed health check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: Some("RouteSafe Backend Running"),
        version: Some(state.version.clone()),
        provider: Some(state.provider.name()),
        uptime_seconds: Some(state.start_time.elapsed().as_secs()),
    })
}

/// Bare liveness probe for the single-endpoint layout
pub async fn ping() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: None,
        version: None,
        provider: None,
        uptime_seconds: None,
    })
}
