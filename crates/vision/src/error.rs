//! Vision Provider Error Types

use road_damage::ReplyError;
use thiserror::Error;

/// Errors talking to a vision provider
#[derive(Debug, Error)]
pub enum VisionError {
    /// No credential configured
    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    /// Transport failure, timeout or undecodable envelope
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected the API key")]
    Unauthorized,

    #[error("Provider rate limit exceeded")]
    RateLimited,

    /// Any other non-success status
    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Response carried no text to parse
    #[error("Provider reply contained no text")]
    EmptyReply,

    /// Text reply could not be coerced into the expected JSON
    #[error(transparent)]
    Reply(#[from] ReplyError),
}
