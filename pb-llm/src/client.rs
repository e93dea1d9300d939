use crate::anthropic::AnthropicProvider;
use crate::error::{LlmError, Result, ValidationError};
use crate::google::GoogleProvider;
use crate::http::RequestEngine;
use crate::openai::OpenAiCompatibleProvider;
use crate::types::{EnhanceOptions, EnhanceRequest, EnhanceResponse, Provider, RequestSettings};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Receiver for streamed text. Higher-ranked so every delta may be a fresh
/// borrow, independent of the lifetimes `#[async_trait]` assigns.
pub type ChunkSink<'a> = dyn for<'s> FnMut(&'s str) + Send + 'a;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const SIMULATED_WORD_DELAY: Duration = Duration::from_millis(50);

const TEST_PROMPT: &str = "Test prompt";
const TEST_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    OpenAi,
    Anthropic,
    Grok,
    Google,
}

/// How an adapter delivers incremental output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStrategy {
    /// The vendor streams deltas over the wire.
    Native,
    /// One blocking call, re-emitted word by word.
    Simulated,
}

impl Vendor {
    pub const ALL: [Vendor; 4] = [Vendor::OpenAi, Vendor::Anthropic, Vendor::Grok, Vendor::Google];

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
    }

    /// Configuration key.
    pub fn name(self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Anthropic => "anthropic",
            Vendor::Grok => "grok",
            Vendor::Google => "google",
        }
    }

    /// Human-facing vendor name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Vendor::OpenAi => "OpenAI",
            Vendor::Anthropic => "Anthropic",
            Vendor::Grok => "Grok",
            Vendor::Google => "Google",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Vendor::OpenAi => "OpenAI GPT models",
            Vendor::Anthropic => "Anthropic Claude models",
            Vendor::Grok => "xAI Grok models",
            Vendor::Google => "Google Gemini models",
        }
    }

    pub fn stream_strategy(self) -> StreamStrategy {
        match self {
            Vendor::OpenAi | Vendor::Grok => StreamStrategy::Native,
            Vendor::Anthropic | Vendor::Google => StreamStrategy::Simulated,
        }
    }
}

#[async_trait]
pub trait EnhanceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn stream_strategy(&self) -> StreamStrategy;

    async fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse>;

    /// Like `enhance`, but hands each text delta to `on_chunk` as it becomes
    /// available. The returned `enhanced` is the full accumulated text.
    async fn enhance_stream(
        &self,
        request: &EnhanceRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<EnhanceResponse>;

    /// Minimal round trip with a fixed prompt and a small token cap.
    async fn probe(&self) -> Result<EnhanceResponse> {
        let request = EnhanceRequest::new(TEST_PROMPT)?.with_options(EnhanceOptions {
            max_tokens: Some(TEST_MAX_TOKENS),
            ..EnhanceOptions::default()
        });
        self.enhance(&request).await
    }

    /// Connectivity check. Never fails: errors are logged and reported as `false`.
    async fn test(&self) -> bool {
        match self.probe().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(provider = %self.name(), error = %e, "provider test failed");
                false
            }
        }
    }
}

/// Maps a provider record to its adapter. Unknown names fail before any I/O.
pub fn create_provider(provider: Provider, settings: RequestSettings) -> Result<Box<dyn EnhanceProvider>> {
    create_provider_with_client(provider, settings, default_http_client())
}

pub fn create_provider_with_client(
    provider: Provider,
    settings: RequestSettings,
    http: reqwest::Client,
) -> Result<Box<dyn EnhanceProvider>> {
    let Some(vendor) = Vendor::from_name(&provider.name) else {
        return Err(ValidationError::UnknownProvider(provider.name).into());
    };
    let core = AdapterCore::new(vendor, provider, http, settings);
    Ok(match vendor {
        Vendor::OpenAi | Vendor::Grok => Box::new(OpenAiCompatibleProvider::new(core)),
        Vendor::Anthropic => Box::new(AnthropicProvider::new(core)),
        Vendor::Google => Box::new(GoogleProvider::new(core)),
    })
}

pub fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(%e, "reqwest client build failed; falling back to default client");
            reqwest::Client::new()
        })
}

/// Roughly four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// State every adapter shares: the immutable provider record and its engine.
pub(crate) struct AdapterCore {
    vendor: Vendor,
    provider: Provider,
    engine: RequestEngine,
}

impl AdapterCore {
    pub(crate) fn new(
        vendor: Vendor,
        provider: Provider,
        http: reqwest::Client,
        settings: RequestSettings,
    ) -> Self {
        let engine = RequestEngine::new(http, &provider.name, settings);
        Self {
            vendor,
            provider,
            engine,
        }
    }

    pub(crate) fn provider(&self) -> &Provider {
        &self.provider
    }

    pub(crate) fn engine(&self) -> &RequestEngine {
        &self.engine
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.provider.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn validate(&self, request: &EnhanceRequest) -> std::result::Result<(), ValidationError> {
        if request.prompt().trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        if self.provider.api_key.is_empty() {
            return Err(ValidationError::MissingApiKey(self.provider.name.clone()));
        }
        if !self.provider.enabled {
            return Err(ValidationError::ProviderDisabled(self.provider.name.clone()));
        }
        Ok(())
    }

    pub(crate) fn invalid_response(&self, detail: impl Into<String>) -> LlmError {
        LlmError::response_format(self.vendor.label(), detail)
    }

    pub(crate) fn build_response(
        &self,
        request: &EnhanceRequest,
        enhanced: String,
        tokens_used: u64,
        started: Instant,
    ) -> EnhanceResponse {
        EnhanceResponse {
            original: request.prompt().to_string(),
            enhanced,
            provider_name: self.provider.name.clone(),
            model: self.provider.model.clone(),
            timestamp: chrono::Utc::now(),
            tokens_used,
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

pub(crate) fn max_tokens(options: &EnhanceOptions) -> u32 {
    options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
}

pub(crate) fn temperature(options: &EnhanceOptions) -> f32 {
    options.temperature.unwrap_or(DEFAULT_TEMPERATURE)
}

/// Re-emits a finished response word by word with `delay` between words.
pub(crate) async fn simulate_stream(
    response: EnhanceResponse,
    on_chunk: &mut ChunkSink<'_>,
    delay: Duration,
) -> EnhanceResponse {
    for (i, word) in response.enhanced.split(' ').enumerate() {
        let chunk = if i == 0 {
            word.to_string()
        } else {
            format!(" {word}")
        };
        if !chunk.is_empty() {
            on_chunk(&chunk);
        }
        tokio::time::sleep(delay).await;
    }
    response
}
