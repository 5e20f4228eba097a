//! API Error Types
//!
//! Every failure a handler can hit ends up here and is rendered as
//! `{"success": false, "error": ...}` with the matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use road_damage::ReplyError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use vision::VisionError;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request had no usable `image` field
    #[error("No image provided")]
    MissingImage,

    /// Body was not a JSON object of the expected shape
    #[error("{0}")]
    BadRequest(String),

    /// Provider answered with text that is not the JSON we asked for
    #[error("Failed to parse AI response")]
    UnparsableReply(ReplyError),

    /// Any other provider or transport failure
    #[error("{0}")]
    Provider(VisionError),
}

/// JSON body of an error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnparsableReply(_) | ApiError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label used for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "missing_image",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnparsableReply(_) => "unparsable_reply",
            ApiError::Provider(_) => "provider",
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Reply(reply) => ApiError::UnparsableReply(reply),
            other => ApiError::Provider(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::UnparsableReply(reply) => {
                error!("Failed to parse AI response: {}", reply);
            }
            ApiError::Provider(err) => error!("Provider error: {}", err),
            _ => warn!("Rejected request: {}", self),
        }
        metrics::counter!("routesafe_errors_total", "kind" => self.kind()).increment(1);

        let raw_response = match &self {
            ApiError::UnparsableReply(reply) => Some(reply.raw_response().to_string()),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            raw_response,
        };

        (status, Json(body)).into_response()
    }
}
