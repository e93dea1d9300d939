use crate::client::{
    AdapterCore, ChunkSink, EnhanceProvider, SIMULATED_WORD_DELAY, StreamStrategy, estimate_tokens, max_tokens,
    simulate_stream, temperature,
};
use crate::error::Result;
use crate::http::RequestSpec;
use crate::prompt::system_prompt;
use crate::types::{EnhanceRequest, EnhanceResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    core: AdapterCore,
}

impl AnthropicProvider {
    pub(crate) fn new(core: AdapterCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl EnhanceProvider for AnthropicProvider {
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
        let body = MessagesRequest::new(&self.core.provider().model, request);
        let spec = RequestSpec::post_json(&body)?
            .header("x-api-key", self.core.provider().api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION);
        let body = self
            .core
            .engine()
            .perform_text(&self.core.url("/v1/messages"), &spec)
            .await?;

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| self.core.invalid_response(format!("json error: {e}")))?;
        let (enhanced, tokens) = parsed
            .into_completion()
            .map_err(|detail| self.core.invalid_response(detail))?;
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: [UserMessage<'a>; 1],
}

impl<'a> MessagesRequest<'a> {
    fn new(model: &'a str, request: &'a EnhanceRequest) -> Self {
        let options = request.options();
        Self {
            model,
            max_tokens: max_tokens(options),
            temperature: temperature(options),
            system: system_prompt(options.mode.unwrap_or_default()),
            messages: [UserMessage {
                role: "user",
                content: request.prompt(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    output_tokens: Option<u64>,
}

impl MessagesResponse {
    /// Text of the first content block and the completion token count.
    fn into_completion(self) -> std::result::Result<(String, u64), String> {
        let text = match self.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => text.trim().to_string(),
            Some(ContentBlock::Other) => return Err("content[0] is not a text block".to_string()),
            None => return Err("missing content[0].text".to_string()),
        };
        if text.is_empty() {
            return Err("content[0].text is empty".to_string());
        }
        let tokens = self
            .usage
            .and_then(|u| u.output_tokens)
            .unwrap_or_else(|| estimate_tokens(&text));
        Ok((text, tokens))
    }
}
