use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Vendor configuration as resolved from the config file and environment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Provider {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("api_key", &key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Verbosity tier of the instruction prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "sm")]
    Small,
    #[default]
    #[serde(alias = "md")]
    Medium,
    #[serde(alias = "lg")]
    Large,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Markdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhanceOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub stream: bool,
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhanceRequest {
    prompt: String,
    provider_name: Option<String>,
    options: EnhanceOptions,
}

impl EnhanceRequest {
    pub fn new(prompt: impl Into<String>) -> Result<Self, ValidationError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        Ok(Self {
            prompt,
            provider_name: None,
            options: EnhanceOptions::default(),
        })
    }

    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_options(mut self, options: EnhanceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    pub fn options(&self) -> &EnhanceOptions {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhanceResponse {
    pub original: String,
    pub enhanced: String,
    pub provider_name: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: u64,
    pub response_time_ms: u64,
}

/// Outcome of one connectivity probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub provider_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub response_time_ms: u64,
    pub model: Option<String>,
}

/// Timeout and retry budget handed to every adapter's request engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Backoff unit: attempt `n` waits `2^n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
        }
    }
}
