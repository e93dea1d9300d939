use crate::client::{
    AdapterCore, ChunkSink, EnhanceProvider, StreamStrategy, estimate_tokens, max_tokens, temperature,
};
use crate::error::{CODE_STREAM_ERROR, ProviderError, Result};
use crate::http::RequestSpec;
use crate::prompt::system_prompt;
use crate::stream::{accumulate, idle_timeout, openai_delta, text_deltas};
use crate::types::{EnhanceRequest, EnhanceResponse};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Chat-completions adapter. Serves OpenAI and Grok, which share the wire format.
pub struct OpenAiCompatibleProvider {
    core: AdapterCore,
}

impl OpenAiCompatibleProvider {
    pub(crate) fn new(core: AdapterCore) -> Self {
        Self { core }
    }

    fn request_spec(&self, request: &EnhanceRequest, stream: bool) -> Result<RequestSpec> {
        let body = ChatCompletionRequest::new(&self.core.provider().model, request, stream);
        Ok(RequestSpec::post_json(&body)?
            .header("authorization", format!("Bearer {}", self.core.provider().api_key)))
    }
}

#[async_trait]
impl EnhanceProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.core.provider().name
    }

    fn model(&self) -> &str {
        &self.core.provider().model
    }

    fn stream_strategy(&self) -> StreamStrategy {
        StreamStrategy::Native
    }

    #[tracing::instrument(level = "info", skip_all, fields(provider = %self.name()))]
    async fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse> {
        self.core.validate(request)?;
        let started = Instant::now();
        let spec = self.request_spec(request, false)?;
        let body = self
            .core
            .engine()
            .perform_text(&self.core.url("/chat/completions"), &spec)
            .await?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| self.core.invalid_response(format!("json error: {e}")))?;
        let enhanced = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.core.invalid_response("missing choices[0].message.content"))?;
        let tokens = parsed
            .usage
            .and_then(|u| u.completion_tokens)
            .unwrap_or_else(|| estimate_tokens(&enhanced));

        Ok(self.core.build_response(request, enhanced, tokens, started))
    }

    #[tracing::instrument(level = "info", skip_all, fields(provider = %self.name()))]
    async fn enhance_stream(
        &self,
        request: &EnhanceRequest,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<EnhanceResponse> {
        self.core.validate(request)?;
        let started = Instant::now();
        let spec = self.request_spec(request, true)?;
        let response = self
            .core
            .engine()
            .perform(&self.core.url("/chat/completions"), &spec)
            .await?;

        let name = self.name();
        let bytes = Box::pin(response.bytes_stream()).map(|chunk| {
            chunk.map_err(|e| {
                ProviderError::new(
                    name,
                    format!("stream interrupted: {}", e.without_url()),
                    CODE_STREAM_ERROR,
                    false,
                )
            })
        });
        let timeout = self.core.engine().settings().timeout;
        let guarded = idle_timeout(bytes, timeout, ProviderError::timeout(name));
        let deltas = text_deltas(Box::pin(guarded), openai_delta);
        let enhanced = accumulate(deltas, &mut *on_chunk).await?;
        if enhanced.trim().is_empty() {
            return Err(self.core.invalid_response("stream carried no content"));
        }
        let tokens = estimate_tokens(&enhanced);
        Ok(self.core.build_response(request, enhanced, tokens, started))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, request: &'a EnhanceRequest, stream: bool) -> Self {
        let options = request.options();
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(options.mode.unwrap_or_default()).into(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt().into(),
                },
            ],
            max_tokens: max_tokens(options),
            temperature: temperature(options),
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    completion_tokens: Option<u64>,
}
