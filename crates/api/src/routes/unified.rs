//! Single-endpoint layout
//!
//! `POST /` with only an image verifies it; with a location as well it runs
//! detection.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::detect::run_detection;
use super::verify::run_verification;
use super::ImageRequest;
use crate::error::ApiError;
use crate::AppState;

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    if request.location.is_some() {
        metrics::counter!("routesafe_requests_total", "endpoint" => "unified_detect").increment(1);
        let report = run_detection(&state, request).await?;
        Ok(Json(report).into_response())
    } else {
        metrics::counter!("routesafe_requests_total", "endpoint" => "unified_verify").increment(1);
        let verdict = run_verification(&state, &request).await?;
        Ok(Json(verdict).into_response())
    }
}
