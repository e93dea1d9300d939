//! Shared request engine: timeout, retry with exponential backoff, and
//! classification of vendor failures into `ProviderError`.

use crate::error::{CODE_NETWORK_ERROR, ProviderError};
use crate::types::RequestSettings;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use std::time::Duration;

const USER_AGENT_VALUE: &str = concat!("promptboost/", env!("CARGO_PKG_VERSION"));

/// One logical request. Cloned cheaply for every retry attempt.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    headers: Vec<(&'static str, String)>,
    body: Bytes,
}

impl RequestSpec {
    pub fn post_json<T: serde::Serialize>(body: &T) -> serde_json::Result<Self> {
        Ok(Self {
            method: Method::POST,
            headers: Vec::new(),
            body: Bytes::from(serde_json::to_vec(body)?),
        })
    }

    /// Adds or overrides a header. Later values win over the engine defaults.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Clone)]
pub struct RequestEngine {
    http: reqwest::Client,
    provider_name: String,
    settings: RequestSettings,
}

impl RequestEngine {
    pub fn new(http: reqwest::Client, provider_name: &str, settings: RequestSettings) -> Self {
        Self {
            http,
            provider_name: provider_name.to_string(),
            settings,
        }
    }

    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Sends `spec` to `url` and returns once response headers arrive, retrying
    /// retryable failures. Used for streamed bodies, which the caller reads.
    /// Each retry is a fresh request with a fresh timeout window. The last error
    /// is returned unchanged.
    #[tracing::instrument(level = "debug", skip_all, fields(provider = %self.provider_name))]
    pub async fn perform(&self, url: &str, spec: &RequestSpec) -> Result<reqwest::Response, ProviderError> {
        let headers = self.build_headers(spec)?;
        let headers = &headers;
        self.with_retries(move || async move {
            match tokio::time::timeout(self.settings.timeout, self.send(url, spec, headers)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(&self.provider_name)),
            }
        })
        .await
    }

    /// Like [`perform`](Self::perform), but the whole body is read inside the
    /// attempt. A body that stalls past the timeout is a retryable `TIMEOUT`.
    #[tracing::instrument(level = "debug", skip_all, fields(provider = %self.provider_name))]
    pub async fn perform_text(&self, url: &str, spec: &RequestSpec) -> Result<String, ProviderError> {
        let headers = self.build_headers(spec)?;
        let headers = &headers;
        self.with_retries(move || async move {
            let exchange = async {
                let response = self.send(url, spec, headers).await?;
                response.text().await.map_err(|e| self.transport_error(e))
            };
            match tokio::time::timeout(self.settings.timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(&self.provider_name)),
            }
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, mut attempt_once: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match attempt_once().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable && attempt < self.settings.max_retries => {
                    let delay = backoff_delay(self.settings.base_delay, attempt);
                    tracing::warn!(
                        provider = %self.provider_name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        code = %e.code,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One exchange up to a successful status. Callers bound it with the
    /// timeout; dropping this future aborts the in-flight call.
    async fn send(
        &self,
        url: &str,
        spec: &RequestSpec,
        headers: &HeaderMap,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .request(spec.method.clone(), url)
            .headers(headers.clone())
            .body(spec.body.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(&self.provider_name, status, &body);
        tracing::debug!(status = status.as_u16(), code = %err.code, retryable = err.retryable, "vendor returned error");
        Err(err)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            return ProviderError::timeout(&self.provider_name);
        }
        ProviderError::new(
            &self.provider_name,
            format!("request failed: {}", e.without_url()),
            CODE_NETWORK_ERROR,
            false,
        )
    }

    fn build_headers(&self, spec: &RequestSpec) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        for (name, value) in &spec.headers {
            let invalid = |what: &str| {
                ProviderError::new(
                    &self.provider_name,
                    format!("invalid {what} for header {name}"),
                    CODE_NETWORK_ERROR,
                    false,
                )
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid("name"))?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid("value"))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn classify_failure(provider_name: &str, status: StatusCode, body: &str) -> ProviderError {
    let details = extract_error_details(body);
    let message = details.message.unwrap_or_else(|| {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        )
    });
    let code = details
        .code
        .unwrap_or_else(|| status.as_u16().to_string());
    ProviderError::new(provider_name, message, code, is_retryable_status(status))
        .with_status(status.as_u16())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ErrorDetails {
    message: Option<String>,
    code: Option<String>,
}

type ErrorShape = fn(&serde_json::Value) -> Option<ErrorDetails>;

/// Known vendor error bodies, most specific first.
const ERROR_SHAPES: &[ErrorShape] = &[nested_error_shape, flat_error_shape];

fn extract_error_details(body: &str) -> ErrorDetails {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return ErrorDetails::default();
    };
    let mut out = ErrorDetails::default();
    for shape in ERROR_SHAPES {
        let Some(found) = shape(&value) else {
            continue;
        };
        if out.message.is_none() {
            out.message = found.message;
        }
        if out.code.is_none() {
            out.code = found.code;
        }
    }
    out
}

/// `{"error": {"message": ..., "code": ...}}` or `{"error": "..."}`.
fn nested_error_shape(v: &serde_json::Value) -> Option<ErrorDetails> {
    match v.get("error")? {
        serde_json::Value::Object(err) => {
            let details = ErrorDetails {
                message: err.get("message").and_then(non_empty_str),
                code: err.get("code").and_then(code_string),
            };
            (details != ErrorDetails::default()).then_some(details)
        }
        other => non_empty_str(other).map(|message| ErrorDetails {
            message: Some(message),
            code: None,
        }),
    }
}

/// `{"message": ..., "code": ...}`.
fn flat_error_shape(v: &serde_json::Value) -> Option<ErrorDetails> {
    let details = ErrorDetails {
        message: v.get("message").and_then(non_empty_str),
        code: v.get("code").and_then(code_string),
    };
    (details != ErrorDetails::default()).then_some(details)
}

fn non_empty_str(v: &serde_json::Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn code_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(4000));
    }

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn nested_openai_error_shape_is_used() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = classify_failure("openai", StatusCode::UNAUTHORIZED, body);
        assert_eq!(err.message, "Incorrect API key provided");
        assert_eq!(err.code, "invalid_api_key");
        assert_eq!(err.status_code, Some(401));
        assert!(!err.retryable);
        assert_eq!(err.provider_name, "openai");
    }

    #[test]
    fn numeric_codes_are_stringified() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure("google", StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.code, "429");
        assert_eq!(err.message, "Resource has been exhausted");
        assert!(err.retryable);
    }

    #[test]
    fn flat_shape_fills_missing_fields() {
        let body = r#"{"message":"overloaded","code":"overloaded_error"}"#;
        let err = classify_failure("anthropic", StatusCode::SERVICE_UNAVAILABLE, body);
        assert_eq!(err.message, "overloaded");
        assert_eq!(err.code, "overloaded_error");

        let body = r#"{"error":{"message":"bad model"},"code":"model_not_found"}"#;
        let err = classify_failure("grok", StatusCode::NOT_FOUND, body);
        assert_eq!(err.message, "bad model");
        assert_eq!(err.code, "model_not_found");
    }

    #[test]
    fn unparseable_body_falls_back_to_status_text() {
        let err = classify_failure("openai", StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(err.message, "HTTP 502: Bad Gateway");
        assert_eq!(err.code, "502");
        assert!(err.retryable);
    }

    #[test]
    fn caller_headers_override_defaults() {
        let engine = RequestEngine::new(reqwest::Client::new(), "openai", RequestSettings::default());
        let spec = RequestSpec::post_json(&serde_json::json!({}))
            .expect("serializes")
            .header("content-type", "application/json; charset=utf-8")
            .header("authorization", "Bearer k");
        let headers = engine.build_headers(&spec).expect("valid headers");
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(headers[USER_AGENT], USER_AGENT_VALUE);
        assert_eq!(headers["authorization"], "Bearer k");
    }

    #[test]
    fn control_characters_in_header_values_are_rejected() {
        let engine = RequestEngine::new(reqwest::Client::new(), "anthropic", RequestSettings::default());
        let spec = RequestSpec::post_json(&serde_json::json!({}))
            .expect("serializes")
            .header("x-api-key", "bad\nkey");
        let err = engine.build_headers(&spec).unwrap_err();
        assert!(!err.retryable);
        assert_eq!(err.code, CODE_NETWORK_ERROR);
    }
}
