//! Vision Providers
//!
//! Clients for the hosted services that do the actual image analysis:
//! - Multimodal chat model (Anthropic Messages API)
//! - Object-detection inference endpoint (Roboflow hosted API)
//!
//! Both sit behind [`VisionProvider`] so the HTTP layer does not care which
//! one is configured.

pub mod anthropic;
pub mod config;
pub mod prompt;
pub mod roboflow;

mod error;

pub use anthropic::AnthropicProvider;
pub use config::{AnthropicConfig, ProviderConfig, ProviderKind, RoboflowConfig};
pub use error::VisionError;
pub use roboflow::RoboflowProvider;

use async_trait::async_trait;
use road_damage::{Analysis, ImagePayload, Verification};
use std::sync::Arc;
use tracing::info;

/// Hosted service that analyzes road images
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logs and metrics
    fn name(&self) -> &'static str;

    /// Look for road damage in the image
    async fn analyze(&self, image: &ImagePayload) -> Result<Analysis, VisionError>;

    /// Check whether the image shows a road at all
    async fn verify(&self, image: &ImagePayload) -> Result<Verification, VisionError>;
}

/// Build the provider selected in configuration
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn VisionProvider>, VisionError> {
    let provider: Arc<dyn VisionProvider> = match config.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config.anthropic())?),
        ProviderKind::Roboflow => Arc::new(RoboflowProvider::new(config.roboflow())?),
    };

    info!("Using vision provider: {}", provider.name());
    Ok(provider)
}
