// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid host names, non-empty paths, and positive timeouts.

use crate::diagnostic::ConfigError;
use crate::model::TallyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TallyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.port == 0 {
        fail("gateway.port must not be 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.intent.timeout_secs == 0 {
        fail("intent.timeout_secs must be greater than 0".to_string());
    }

    for (i, provider) in config.intent.providers.iter().enumerate() {
        if provider.model.trim().is_empty() {
            fail(format!("intent.providers[{i}].model must not be empty"));
        }
        if let Some(url) = &provider.base_url
            && !url.starts_with("http")
        {
            fail(format!(
                "intent.providers[{i}].base_url `{url}` must start with http:// or https://"
            ));
        }
    }

    if config.media.enabled && config.media.api_key.as_deref().is_none_or(str::is_empty) {
        fail("media.api_key is required when media.enabled = true".to_string());
    }

    if config.dialogue.recent_expenses_limit == 0 {
        fail("dialogue.recent_expenses_limit must be greater than 0".to_string());
    }

    if config.dialogue.default_category.trim().is_empty() {
        fail("dialogue.default_category must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
