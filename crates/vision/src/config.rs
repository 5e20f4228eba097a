//! Vision provider configuration

use serde::{Deserialize, Serialize};

/// Which hosted service to call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Multimodal chat model
    #[default]
    Anthropic,
    /// Object-detection inference API
    Roboflow,
}

impl ProviderKind {
    /// Conventional environment variable holding the provider's credential
    pub fn env_var_name(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Roboflow => "ROBOFLOW_API_KEY",
        }
    }
}

/// Provider settings as loaded from configuration.
///
/// Flat on purpose so every field can be overridden from a single
/// environment variable; the per-provider configs are derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Credential for the selected provider
    pub api_key: Option<String>,

    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,

    /// Outbound request timeout (seconds)
    pub timeout_secs: u64,

    /// Chat model name (anthropic)
    pub model: String,

    /// Completion token limit (anthropic)
    pub max_tokens: u32,

    /// `<project>/<version>` of the hosted detection model (roboflow)
    pub model_id: String,

    /// Minimum prediction confidence in percent (roboflow)
    pub confidence: u8,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let anthropic = AnthropicConfig::default();
        let roboflow = RoboflowConfig::default();
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            base_url: None,
            timeout_secs: anthropic.timeout_secs,
            model: anthropic.model,
            max_tokens: anthropic.max_tokens,
            model_id: roboflow.model_id,
            confidence: roboflow.confidence,
        }
    }
}

impl ProviderConfig {
    /// Settings for [`AnthropicProvider`](crate::AnthropicProvider)
    pub fn anthropic(&self) -> AnthropicConfig {
        let defaults = AnthropicConfig::default();
        AnthropicConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }

    /// Settings for [`RoboflowProvider`](crate::RoboflowProvider)
    pub fn roboflow(&self) -> RoboflowConfig {
        let defaults = RoboflowConfig::default();
        RoboflowConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            model_id: self.model_id.clone(),
            confidence: self.confidence,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Anthropic Messages API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

/// Roboflow hosted inference settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoboflowConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub confidence: u8,
    pub timeout_secs: u64,
}

impl Default for RoboflowConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://detect.roboflow.com".to_string(),
            model_id: "pothole-detection-system/1".to_string(),
            confidence: 40,
            timeout_secs: 60,
        }
    }
}
