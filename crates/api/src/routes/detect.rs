//! Detection Routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use road_damage::{DetectionReport, ImagePayload};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::ImageRequest;
use crate::error::ApiError;
use crate::AppState;

/// Detect road damage in the posted image
pub async fn detect(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<DetectionReport>, ApiError> {
    let Json(request) = payload?;
    metrics::counter!("routesafe_requests_total", "endpoint" => "detect").increment(1);

    run_detection(&state, request).await.map(Json)
}

/// Shared by the legacy and unified endpoints
pub(crate) async fn run_detection(
    state: &AppState,
    request: ImageRequest,
) -> Result<DetectionReport, ApiError> {
    let image = request
        .image()
        .map(ImagePayload::normalize)
        .ok_or(ApiError::MissingImage)?;
    let location = request.location.unwrap_or_else(|| json!({}));

    let span = info_span!(
        "detect",
        request_id = %Uuid::new_v4(),
        provider = state.provider.name()
    );

    async move {
        info!(
            "Analyzing {} image ({} bytes)",
            image.media_type(),
            image.len()
        );

        let analysis = state.provider.analyze(&image).await?;
        let report = DetectionReport::new(analysis, location);

        for detection in &report.analysis.detections {
            metrics::counter!(
                "routesafe_detections_total",
                "severity" => detection
                    .severity
                    .as_ref()
                    .map_or("unrated", |severity| severity.as_str())
                    .to_string()
            )
            .increment(1);
        }

        info!("Found {} damaged areas", report.analysis.total_potholes);
        Ok::<_, ApiError>(report)
    }
    .instrument(span)
    .await
}
