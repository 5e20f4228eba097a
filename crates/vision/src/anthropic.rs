//! Anthropic Messages API provider
//!
//! Sends the image as a base64 content block next to a text instruction and
//! coerces the model's text reply into JSON.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use road_damage::{parse_reply, truncate_raw, Analysis, ImagePayload, MediaType, Verification};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AnthropicConfig;
use crate::prompt::{DETECTION_PROMPT, VERIFICATION_PROMPT};
use crate::{VisionError, VisionProvider};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: [ContentBlock<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: MediaType,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for Anthropic's multimodal Messages API
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
    api_key: String,
}

impl AnthropicProvider {
    /// Create a provider; fails without an API key
    pub fn new(config: AnthropicConfig) -> Result<Self, VisionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(VisionError::MissingApiKey("anthropic"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Send one image plus instruction and return the reply text
    async fn complete(&self, image: &ImagePayload, prompt: &str) -> Result<String, VisionError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [Message {
                role: "user",
                content: [
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: image.media_type(),
                            data: image.data(),
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        };

        debug!(
            "Calling Anthropic model {} with {} bytes of {}",
            self.config.model,
            image.len(),
            image.media_type()
        );

        let response = self
            .client
            .post(format!(
                "{}/v1/messages",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
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
            warn!("Anthropic returned HTTP {}", status);
            return Err(VisionError::Api {
                status: status.as_u16(),
                message: truncate_raw(&text),
            });
        }

        let reply: MessagesResponse = response.json().await?;
        reply
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(VisionError::EmptyReply)
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn analyze(&self, image: &ImagePayload) -> Result<Analysis, VisionError> {
        let text = self.complete(image, DETECTION_PROMPT).await?;
        Ok(parse_reply(&text)?)
    }

    async fn verify(&self, image: &ImagePayload) -> Result<Verification, VisionError> {
        let text = self.complete(image, VERIFICATION_PROMPT).await?;
        Ok(parse_reply(&text)?)
    }
}
