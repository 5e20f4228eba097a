//! Roboflow hosted object-detection provider
//!
//! The detection API returns bounding boxes, not a damage report, so each
//! prediction is mapped field by field into a [`Detection`] and the
//! road-level assessment is derived from the counts.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use road_damage::{
    truncate_raw, Analysis, Detection, ImagePayload, RiskLevel, RoadCondition, Severity,
    Verification,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RoboflowConfig;
use crate::{VisionError, VisionProvider};

/// Box area share of the image at or above which damage counts as large
const LARGE_AREA_SHARE: f64 = 0.10;
/// Box area share at or above which damage counts as medium
const MEDIUM_AREA_SHARE: f64 = 0.03;

/// Inference response envelope
#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    image: Option<ImageSize>,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ImageSize {
    width: f64,
    height: f64,
}

/// Single bounding box; `x`/`y` are the box centre in pixels
#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    confidence: f64,
    class: String,
}

/// Client for Roboflow's hosted inference endpoint
pub struct RoboflowProvider {
    client: Client,
    config: RoboflowConfig,
    api_key: String,
}

impl RoboflowProvider {
    /// Create a provider; fails without an API key
    pub fn new(config: RoboflowConfig) -> Result<Self, VisionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(VisionError::MissingApiKey("roboflow"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn infer(&self, image: &ImagePayload) -> Result<InferenceResponse, VisionError> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_id.trim_start_matches('/')
        );
        let confidence = self.config.confidence.to_string();

        debug!("Calling Roboflow model {}", self.config.model_id);

        let response = self
            .client
            .post(url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("confidence", confidence.as_str()),
            ])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(image.data().to_string())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(VisionError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VisionError::RateLimited);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Roboflow returned HTTP {}", status);
            return Err(VisionError::Api {
                status: status.as_u16(),
                message: truncate_raw(&text),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VisionProvider for RoboflowProvider {
    fn name(&self) -> &'static str {
        "roboflow"
    }

    async fn analyze(&self, image: &ImagePayload) -> Result<Analysis, VisionError> {
        let inference = self.infer(image).await?;
        Ok(to_analysis(inference))
    }

    async fn verify(&self, _image: &ImagePayload) -> Result<Verification, VisionError> {
        // Detection models have no notion of "not a road"
        Ok(Verification::accepted())
    }
}

fn to_analysis(inference: InferenceResponse) -> Analysis {
    let detections: Vec<Detection> = inference
        .predictions
        .iter()
        .enumerate()
        .map(|(index, prediction)| to_detection(index as u32 + 1, prediction, inference.image))
        .collect();

    let high = detections
        .iter()
        .filter(|d| d.severity == Some(Severity::High))
        .count();

    Analysis {
        has_potholes: !detections.is_empty(),
        total_potholes: detections.len(),
        road_condition: Some(assess_condition(high, detections.len())),
        overall_risk_level: Some(assess_risk(high, detections.len())),
        detections,
        ..Default::default()
    }
}

fn to_detection(id: u32, prediction: &Prediction, image: Option<ImageSize>) -> Detection {
    let image = image.filter(|size| size.width > 0.0 && size.height > 0.0);
    let share = image
        .map(|size| (prediction.width * prediction.height) / (size.width * size.height))
        .unwrap_or(0.0);

    let (severity, size) = if share >= LARGE_AREA_SHARE {
        (Severity::High, "large")
    } else if share >= MEDIUM_AREA_SHARE {
        (Severity::Medium, "medium")
    } else {
        (Severity::Low, "small")
    };

    let damage_type = prediction.class.replace(['_', '-'], " ").to_lowercase();
    let confidence = prediction.confidence.clamp(0.0, 1.0);

    Detection {
        id: Some(id),
        severity: Some(severity),
        confidence: Some(confidence),
        description: Some(format!(
            "{} detected with {:.0}% confidence",
            damage_type,
            confidence * 100.0
        )),
        damage_type: Some(damage_type),
        estimated_size: Some(size.to_string()),
        location: image.map(|size| grid_position(prediction.x, prediction.y, size)),
        ..Default::default()
    }
}

/// Name the cell of a 3x3 grid the box centre falls in
fn grid_position(x: f64, y: f64, image: ImageSize) -> String {
    let column = match x / image.width {
        f if f < 1.0 / 3.0 => "left",
        f if f < 2.0 / 3.0 => "center",
        _ => "right",
    };
    let row = match y / image.height {
        f if f < 1.0 / 3.0 => "top",
        f if f < 2.0 / 3.0 => "middle",
        _ => "bottom",
    };

    if row == "middle" && column == "center" {
        "center".to_string()
    } else {
        format!("{}-{}", row, column)
    }
}

fn assess_condition(high: usize, total: usize) -> RoadCondition {
    match (high, total) {
        (_, 0) => RoadCondition::Excellent,
        (0, 1..=2) => RoadCondition::Good,
        (0, _) => RoadCondition::Fair,
        (1..=2, _) => RoadCondition::Poor,
        _ => RoadCondition::VeryPoor,
    }
}

fn assess_risk(high: usize, total: usize) -> RiskLevel {
    match (high, total) {
        (3.., _) => RiskLevel::Critical,
        (1.., _) => RiskLevel::High,
        (_, 1..) => RiskLevel::Moderate,
        _ => RiskLevel::Low,
    }
}
