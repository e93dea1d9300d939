use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The vendor answered 2xx but the body lacks the expected fields.
    #[error("Invalid response from {vendor} API")]
    ResponseFormat { vendor: &'static str, detail: String },
}

impl LlmError {
    pub fn response_format(vendor: &'static str, detail: impl Into<String>) -> Self {
        Self::ResponseFormat {
            vendor,
            detail: detail.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(e) if e.retryable)
    }

    pub fn as_provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

/// Bad local input. Never retried and never sent over the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("API key not configured for provider: {0}")]
    MissingApiKey(String),

    #[error("Provider is disabled: {0}")]
    ProviderDisabled(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid base URL for provider {provider}: {reason}")]
    InvalidBaseUrl { provider: String, reason: String },

    #[error("Model '{model}' is not valid for provider '{provider}'")]
    UnknownModel { provider: String, model: String },
}

pub const CODE_TIMEOUT: &str = "TIMEOUT";
pub const CODE_NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const CODE_STREAM_ERROR: &str = "STREAM_ERROR";

/// Network or vendor-side failure. `retryable` drives the request engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub provider_name: String,
    pub code: String,
    pub retryable: bool,
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub fn new(
        provider_name: &str,
        message: impl Into<String>,
        code: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            message: message.into(),
            provider_name: provider_name.to_string(),
            code: code.into(),
            retryable,
            status_code: None,
        }
    }

    pub fn timeout(provider_name: &str) -> Self {
        Self::new(provider_name, "Request timeout", CODE_TIMEOUT, true)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }
}
