// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for provider clients: JSON POST with one retry on
//! transient errors and vendor error-body decoding.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::TallyError;
use tracing::{debug, warn};

/// Error envelope shared by the Anthropic and OpenAI APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    type_: Option<String>,
    #[serde(default)]
    message: String,
}

/// Build a reqwest client with the given default headers.
pub(crate) fn build_client(
    headers: reqwest::header::HeaderMap,
    timeout: Duration,
) -> Result<reqwest::Client, TallyError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| TallyError::Provider {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
pub(crate) fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

/// Format a non-success response body into an error message.
pub(crate) fn describe_error(vendor: &str, status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "{vendor} API error ({}): {}",
            api_err.error.type_.as_deref().unwrap_or("unknown"),
            api_err.error.message
        ),
        Err(_) => format!("{vendor} API returned {status}: {body}"),
    }
}

/// POST a JSON body and return the successful response text.
///
/// On transient errors (429, 500, 503, 529), retries after a 1-second delay.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    max_retries: u32,
    vendor: &str,
) -> Result<String, TallyError> {
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            warn!(vendor, attempt, "retrying request after transient error");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let response = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TallyError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(vendor, status = %status, attempt, "response received");

        if status.is_success() {
            return response.text().await.map_err(|e| TallyError::Provider {
                message: format!("failed to read response body: {e}"),
                source: Some(Box::new(e)),
            });
        }

        let text = response.text().await.unwrap_or_default();
        if is_transient_error(status) && attempt < max_retries {
            warn!(vendor, status = %status, "transient error, will retry");
            last_error = Some(TallyError::provider(describe_error(vendor, status, &text)));
            continue;
        }

        return Err(TallyError::provider(describe_error(vendor, status, &text)));
    }

    Err(last_error
        .unwrap_or_else(|| TallyError::provider(format!("{vendor} request failed after retries"))))
}

/// Resolve an API key from config, then the given environment variable.
pub(crate) fn resolve_api_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
}
