//! Route handlers

pub mod detect;
pub mod health;
pub mod unified;
pub mod verify;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Body accepted by every image endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ImageRequest {
    /// Data-URL or bare base64 image
    #[serde(default)]
    pub image: Option<String>,

    /// Caller's location, echoed back in detection reports.
    ///
    /// `None` only when the key is absent; an explicit `null` is kept.
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ImageRequest {
    /// Image string, treating an empty one as missing
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.is_empty())
    }
}
