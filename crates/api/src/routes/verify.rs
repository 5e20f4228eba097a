//! Image Verification Routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use road_damage::{ImagePayload, Verification};
use std::sync::Arc;
use tracing::debug;

use super::ImageRequest;
use crate::config::VerificationMode;
use crate::error::ApiError;
use crate::AppState;

/// Check whether the posted image is worth analyzing
pub async fn verify_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Verification>, ApiError> {
    let Json(request) = payload?;
    metrics::counter!("routesafe_requests_total", "endpoint" => "verify").increment(1);

    run_verification(&state, &request).await.map(Json)
}

pub(crate) async fn run_verification(
    state: &AppState,
    request: &ImageRequest,
) -> Result<Verification, ApiError> {
    let image = request
        .image()
        .map(ImagePayload::normalize)
        .ok_or(ApiError::MissingImage)?;

    match state.verification {
        VerificationMode::AcceptAll => Ok(Verification::accepted()),
        VerificationMode::Provider => {
            let verdict = state.provider.verify(&image).await?;
            debug!("Verification: valid={} ({})", verdict.is_valid, verdict.reason);
            Ok(verdict)
        }
    }
}
