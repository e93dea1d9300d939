//! Prompt enhancement over BYO-key LLM vendors.
//!
//! Pure HTTP client. One adapter per wire format, all behind
//! [`EnhanceProvider`], sharing a retrying request engine and a streaming
//! decoder.

mod anthropic;
mod client;
mod connectivity;
mod error;
mod google;
mod http;
pub mod models;
mod openai;
mod prompt;
pub mod stream;
mod types;

pub use client::{
    ChunkSink, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, EnhanceProvider, SIMULATED_WORD_DELAY, StreamStrategy, Vendor,
    create_provider, create_provider_with_client, default_http_client, estimate_tokens,
};
pub use connectivity::check_provider;
pub use error::{
    CODE_NETWORK_ERROR, CODE_STREAM_ERROR, CODE_TIMEOUT, LlmError, ProviderError, Result, ValidationError,
};
pub use http::{RequestEngine, RequestSpec};
pub use prompt::system_prompt;
pub use types::{
    EnhanceOptions, EnhanceRequest, EnhanceResponse, Mode, OutputFormat, Provider, RequestSettings, TestResult,
};
