// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible Chat Completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tally_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, TallyError,
};
use tracing::info;

use crate::http;

const API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub type_: &'static str,
}

impl ResponseFormat {
    pub(crate) fn json_object() -> Self {
        Self {
            type_: "json_object",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Parse a raw body and take the first choice's text.
    pub(crate) fn first_text(raw: &str) -> Result<(String, String), TallyError> {
        let response: ChatResponse =
            serde_json::from_str(raw).map_err(|e| TallyError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| TallyError::provider("OpenAI response had no message content"))?;
        Ok((text, response.model))
    }
}

/// Headers for bearer-authenticated OpenAI calls.
pub(crate) fn bearer_headers(api_key: &str) -> Result<HeaderMap, TallyError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| TallyError::Config(format!("invalid API key header value: {e}")))?,
    );
    Ok(headers)
}

/// OpenAI provider implementing [`ProviderAdapter`].
///
/// Works against any endpoint speaking the Chat Completions dialect.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<&str>,
        model: impl Into<String>,
        base_url: Option<&str>,
    ) -> Result<Self, TallyError> {
        let api_key = http::resolve_api_key(api_key, "OPENAI_API_KEY").ok_or_else(|| {
            TallyError::Config("openai provider needs api_key or OPENAI_API_KEY".to_string())
        })?;

        let mut headers = bearer_headers(&api_key)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let model = model.into();
        let root = base_url.unwrap_or(API_BASE_URL).trim_end_matches('/');
        info!(model = %model, "OpenAI provider initialized");

        Ok(Self {
            client: http::build_client(headers, Duration::from_secs(60))?,
            model,
            url: format!("{root}/chat/completions"),
            max_retries: 1,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TallyError> {
        let body = ChatRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: serde_json::Value::String(request.system),
                },
                ChatMessage {
                    role: "user",
                    content: serde_json::Value::String(request.prompt),
                },
            ],
            response_format: Some(ResponseFormat::json_object()),
        };

        let raw =
            http::post_json(&self.client, &self.url, &body, self.max_retries, "OpenAI").await?;
        let (text, model) = ChatResponse::first_text(&raw)?;
        Ok(CompletionResponse {
            text,
            model: if model.is_empty() {
                self.model.clone()
            } else {
                model
            },
        })
    }
}
