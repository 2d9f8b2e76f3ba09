//! Configuration System
//!
//! Layered configuration with serde defaults: a TOML file (optional) plus
//! `OUTREACH_*` environment variable overrides. The provider API key
//! additionally falls back to the `OPENAI_API_KEY` environment variable so
//! deployments can keep the credential out of config files.

use crate::error::ApiError;
use crate::generation::DegradedMode;
use crate::logging::LoggingConfig;
use crate::provider::{InvocationMode, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Model provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Generation pipeline settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; when absent, resolved from OPENAI_API_KEY at startup
    #[serde(default)]
    pub api_key: Option<String>,

    /// Custom endpoint (e.g. a proxy or an OpenAI-compatible local server)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Output contract requested from the provider
    #[serde(default)]
    pub mode: InvocationMode,

    /// Behavior when the provider is unreachable or credentials are absent
    #[serde(default)]
    pub degraded_mode: DegradedMode,

    /// Prompt template version
    #[serde(default = "default_template_version")]
    pub template_version: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_template_version() -> String {
    crate::prompt::DEFAULT_TEMPLATE_VERSION.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            mode: InvocationMode::default(),
            degraded_mode: DegradedMode::default(),
            template_version: default_template_version(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the credential from config or the environment. An empty string
    /// counts as absent.
    pub fn resolve_api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default()
    }
}

/// Generation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum leads per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches (seconds)
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_pause_secs() -> u64 {
    2
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_secs: default_batch_pause_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}

/// Retry policy knobs, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    #[serde(default = "default_post_retry_pause_secs")]
    pub post_retry_pause_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    4
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_post_retry_pause_secs() -> u64 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            post_retry_pause_secs: default_post_retry_pause_secs(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.base_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            post_retry_pause: Duration::from_secs(self.post_retry_pause_secs),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// CORS allowed origins; empty means permissive
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

impl OutreachConfig {
    /// Load configuration from an optional TOML file plus `OUTREACH_*`
    /// environment overrides (e.g. `OUTREACH_PROVIDER__MODEL`).
    pub fn load(path: Option<&Path>) -> Result<Self, ApiError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("outreach").required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix("OUTREACH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: OutreachConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.provider.model.trim().is_empty() {
            return Err(ApiError::ConfigError("Model cannot be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ApiError::ConfigError(format!(
                "Temperature must be within 0.0-2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.generation.batch_size == 0 {
            return Err(ApiError::ConfigError(
                "Batch size must be at least 1".to_string(),
            ));
        }
        if self.generation.retry.max_attempts == 0 {
            return Err(ApiError::ConfigError(
                "Retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
