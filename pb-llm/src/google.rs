use crate::client::{
    AdapterCore, ChunkSink, EnhanceProvider, SIMULATED_WORD_DELAY, StreamStrategy, estimate_tokens, max_tokens,
    simulate_stream, temperature,
};
use crate::error::{Result, ValidationError};
use crate::http::RequestSpec;
use crate::prompt::system_prompt;
use crate::types::{EnhanceRequest, EnhanceResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini `generateContent` adapter. The key travels as a query parameter.
pub struct GoogleProvider {
    core: AdapterCore,
}

impl GoogleProvider {
    pub(crate) fn new(core: AdapterCore) -> Self {
        Self { core }
    }

    /// `…/v1beta/models/{model}:generateContent?key={api_key}`, key percent-encoded.
    fn endpoint(&self) -> std::result::Result<reqwest::Url, ValidationError> {
        let provider = self.core.provider();
        let raw = self
            .core
            .url(&format!("/v1beta/models/{}:generateContent", provider.model));
        let mut url = reqwest::Url::parse(&raw).map_err(|e| ValidationError::InvalidBaseUrl {
            provider: provider.name.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("key", &provider.api_key);
        Ok(url)
    }
}

#[async_trait]
impl EnhanceProvider for GoogleProvider {
    fn name(&self) -> &str {
        &self.core.provider().name
    }

    fn model(&self) -> &str {
        &self.core.provider().model
    }

    fn stream_strategy(&self) -> StreamStrategy {
        StreamStrategy::Simulated
    }

    #[tracing::instrument(level = "info", skip_all, fields(provider = %self.name()))]
    async fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse> {
        self.core.validate(request)?;
        let started = Instant::now();
        let url = self.endpoint()?;
        let spec = RequestSpec::post_json(&GenerateContentRequest::new(request))?;
        let body = self.core.engine().perform_text(url.as_str(), &spec).await?;

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| self.core.invalid_response(format!("json error: {e}")))?;
        let enhanced = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.core.invalid_response("missing candidates[0].content.parts[0].text"))?;
        let tokens = parsed
            .usage_metadata
            .and_then(|u| u.candidates_token_count)
            .unwrap_or_else(|| estimate_tokens(&enhanced));

        Ok(self.core.build_response(request, enhanced, tokens, started))
    }

    async fn enhance_stream(
        &self,
        request: &EnhanceRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<EnhanceResponse> {
        let response = self.enhance(request).await?;
        Ok(simulate_stream(response, on_chunk, SIMULATED_WORD_DELAY).await)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Gemini has no system role here, so the instructions are folded into the text.
    fn new(request: &EnhanceRequest) -> Self {
        let options = request.options();
        let system = system_prompt(options.mode.unwrap_or_default());
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{system}\n\nOriginal prompt: {}", request.prompt()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens(options),
                temperature: temperature(options),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    candidates_token_count: Option<u64>,
}
