use crate::client::create_provider_with_client;
use crate::types::{Provider, RequestSettings, TestResult};
use std::time::Instant;

/// Probes one provider and reports the outcome. Never fails; any error,
/// including an unknown provider name, ends up in `TestResult::error`.
#[tracing::instrument(level = "info", skip_all, fields(provider = %provider.name))]
pub async fn check_provider(
    provider: &Provider,
    settings: RequestSettings,
    http: reqwest::Client,
) -> TestResult {
    let started = Instant::now();
    let outcome = match create_provider_with_client(provider.clone(), settings, http) {
        Ok(adapter) => adapter.probe().await,
        Err(e) => Err(e),
    };
    let elapsed = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(response) => TestResult {
            provider_name: provider.name.clone(),
            success: true,
            error: None,
            response_time_ms: elapsed,
            model: Some(response.model),
        },
        Err(e) => {
            tracing::warn!(error = %e, "provider check failed");
            TestResult {
                provider_name: provider.name.clone(),
                success: false,
                error: Some(e.to_string()),
                response_time_ms: elapsed,
                model: None,
            }
        }
    }
}
