//! Provider Reply Coercion
//!
//! Multimodal models are asked for bare JSON but often wrap it in Markdown
//! fences anyway. The fences are removed and the remainder parsed; anything
//! still not decodable becomes a [`ReplyError`] with a short preview.

use crate::error::ReplyError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Number of characters of raw reply kept in parse errors
pub const RAW_PREVIEW_CHARS: usize = 500;

/// Remove Markdown code fence markers and surrounding whitespace.
///
/// Markers are removed wherever they occur, not only at the edges.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// First [`RAW_PREVIEW_CHARS`] characters of `text`
pub fn truncate_raw(text: &str) -> String {
    text.chars().take(RAW_PREVIEW_CHARS).collect()
}

/// Parse a provider reply into `T`.
///
/// Decoding happens in two steps so that "not JSON at all" and "JSON of the
/// wrong shape" surface as different errors.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, ReplyError> {
    let cleaned = strip_code_fences(text);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        warn!("Provider reply is not JSON: {}", e);
        debug!("Reply was: {}", cleaned);
        ReplyError::InvalidJson {
            reason: e.to_string(),
            raw: truncate_raw(&cleaned),
        }
    })?;

    serde_json::from_value(value).map_err(|e| {
        warn!("Provider reply has unexpected shape: {}", e);
        ReplyError::Schema {
            reason: e.to_string(),
            raw: truncate_raw(&cleaned),
        }
    })
}
