//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `ROUTESAFE__SECTION__KEY` environment variables. The
//! conventional `PORT` and provider API key variables are applied last.

use config::{Config, ConfigError, Environment, File, Source};
use serde::{Deserialize, Serialize};
use vision::ProviderConfig;

use crate::rate_limit::RateLimitConfig;

/// Config file read when `ROUTESAFE_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "routesafe.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "ROUTESAFE_CONFIG";

const ENV_PREFIX: &str = "ROUTESAFE";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub verification: VerificationConfig,
    pub rate_limit: RateLimitConfig,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body; base64 photos are big
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// How `verify-image` requests are answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Accept every image without contacting the provider
    #[default]
    AcceptAll,
    /// Ask the vision provider whether the image shows a road
    Provider,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub mode: VerificationMode,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics at `/metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServiceConfig {
    /// Load from the process environment and the configured file
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let file = File::with_name(&path).required(false);
        let env = Environment::with_prefix(ENV_PREFIX).separator("__");

        Self::from_sources(file, env, |name| std::env::var(name).ok())
    }

    /// Build from explicit sources.
    ///
    /// `lookup` resolves the conventional variables (`PORT`, provider API
    /// keys) so tests need not touch the process environment.
    pub fn from_sources<F, L>(file: F, env: Environment, lookup: L) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
        L: Fn(&str) -> Option<String>,
    {
        let mut config: ServiceConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if let Some(port) = lookup("PORT") {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("Invalid PORT value: {}", port)))?;
        }

        if config.provider.api_key.is_none() {
            config.provider.api_key = lookup(config.provider.kind.env_var_name());
        }

        Ok(config)
    }

    /// Socket address to bind
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
