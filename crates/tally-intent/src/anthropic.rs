// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tally_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, TallyError,
};
use tracing::info;

use crate::http;

/// Default API root; `/v1/messages` is appended.
const API_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config, then `ANTHROPIC_API_KEY`.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: Option<&str>,
        model: impl Into<String>,
        base_url: Option<&str>,
    ) -> Result<Self, TallyError> {
        let api_key = http::resolve_api_key(api_key, "ANTHROPIC_API_KEY").ok_or_else(|| {
            TallyError::Config(
                "anthropic provider needs api_key or ANTHROPIC_API_KEY".to_string(),
            )
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| TallyError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let model = model.into();
        let root = base_url.unwrap_or(API_BASE_URL).trim_end_matches('/');
        info!(model = %model, "Anthropic provider initialized");

        Ok(Self {
            client: http::build_client(headers, Duration::from_secs(60))?,
            model,
            url: format!("{root}/v1/messages"),
            max_retries: 1,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TallyError> {
        let body = MessageRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let raw = http::post_json(&self.client, &self.url, &body, self.max_retries, "Anthropic")
            .await?;
        let response: MessageResponse =
            serde_json::from_str(&raw).map_err(|e| TallyError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let text: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Other => None,
            })
            .collect();
        if text.trim().is_empty() {
            return Err(TallyError::provider("Anthropic response had no text content"));
        }

        Ok(CompletionResponse {
            text,
            model: response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(Some("test-api-key"), "claude-haiku-4-5", Some(base_url)).unwrap()
    }

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            system: "classify".into(),
            prompt: "Message: lunch 12".into(),
            max_tokens: 256,
        }
    }

    fn text_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-haiku-4-5",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_returns_text_and_sends_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_response(r#"{"action":"help"}"#)),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let result = provider.complete(test_request()).await.unwrap();
        assert_eq!(result.text, r#"{"action":"help"}"#);
        assert_eq!(result.model, "claude-haiku-4-5");
    }

    #[tokio::test]
    async fn complete_retries_on_429() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "Rate limited"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("after retry")))
            .mount(&server)
            .await;

        let result = test_provider(&server.uri())
            .complete(test_request())
            .await
            .unwrap();
        assert_eq!(result.text, "after retry");
    }

    #[tokio::test]
    async fn complete_fails_on_400_with_vendor_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .complete(test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "claude-haiku-4-5",
                "content": [{"type": "thinking", "thinking": "hmm"}]
            })))
            .mount(&server)
            .await;

        assert!(
            test_provider(&server.uri())
                .complete(test_request())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&format!("{}/", server.uri()));
        assert_eq!(provider.model(), "claude-haiku-4-5");
        assert_eq!(provider.complete(test_request()).await.unwrap().text, "ok");
    }
}
