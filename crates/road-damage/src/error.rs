//! Reply Coercion Error Types

use thiserror::Error;

/// Errors while turning a provider's text reply into a typed value
///
/// Both variants carry `raw`, a preview of the offending text truncated to
/// [`RAW_PREVIEW_CHARS`](crate::RAW_PREVIEW_CHARS) characters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplyError {
    /// Reply text is not decodable as JSON
    #[error("Provider reply is not valid JSON: {reason}")]
    InvalidJson { reason: String, raw: String },

    /// Reply is JSON but does not fit the expected shape
    #[error("Provider reply does not match the expected schema: {reason}")]
    Schema { reason: String, raw: String },
}

impl ReplyError {
    /// Truncated raw text that failed to parse
    pub fn raw_response(&self) -> &str {
        match self {
            ReplyError::InvalidJson { raw, .. } | ReplyError::Schema { raw, .. } => raw,
        }
    }
}
