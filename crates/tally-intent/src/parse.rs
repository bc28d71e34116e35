// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing model output into typed values.

use serde::de::DeserializeOwned;
use tally_core::{Intent, TallyError};
use tracing::debug;

/// Locate the outermost JSON object in a model reply.
///
/// Handles markdown code fences and prose around the object.
pub fn json_object_slice(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

/// Parse a JSON object out of a model reply.
pub fn parse_json_object<T: DeserializeOwned>(response: &str) -> Result<T, TallyError> {
    let json_str = json_object_slice(response).ok_or_else(|| {
        debug!(raw = response, "no JSON object in model response");
        TallyError::provider("model response contained no JSON object")
    })?;
    serde_json::from_str(json_str).map_err(|e| TallyError::Provider {
        message: format!("failed to parse model response: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a classification reply. Unrecognized actions become `unknown`;
/// unparseable output is an error so the fallback chain moves on.
pub fn parse_intent_response(response: &str) -> Result<Intent, TallyError> {
    parse_json_object(response)
}
