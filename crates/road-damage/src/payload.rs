//! Image Payload Normalization
//!
//! Callers send either a bare base64 blob or a data-URL. Providers want the
//! bare blob plus a media type, so the prefix is cut off here and the media
//! type guessed from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a PNG data-URL
const PNG_DATA_URL_PREFIX: &str = "data:image/png";

/// Media type forwarded to the vision provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
}

impl MediaType {
    /// Guess the media type from the caller's original image string.
    ///
    /// Only a leading `data:image/png` selects PNG; everything else,
    /// including other data-URL types and bare base64, falls back to JPEG.
    pub fn sniff(original: &str) -> Self {
        if original.starts_with(PNG_DATA_URL_PREFIX) {
            MediaType::Png
        } else {
            MediaType::Jpeg
        }
    }

    /// MIME string
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bare base64 image data with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: String,
    media_type: MediaType,
}

impl ImagePayload {
    /// Normalize a caller-supplied image string.
    ///
    /// Everything up to and including the first comma is dropped; a string
    /// without a comma is taken as-is. The payload itself is not decoded.
    pub fn normalize(input: &str) -> Self {
        let data = match input.split_once(',') {
            Some((_, rest)) => rest,
            None => input,
        };

        Self {
            data: data.to_string(),
            media_type: MediaType::sniff(input),
        }
    }

    /// Base64 data without any data-URL prefix
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Length of the base64 data in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
