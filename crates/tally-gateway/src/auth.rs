// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authentication middleware.
//!
//! Telegram proves origin with a shared secret header chosen at
//! `setWebhook` time; Meta signs each WhatsApp delivery with the app secret.
//! Both checks are skipped when the corresponding secret is not configured.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::server::GatewayState;

pub const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
pub const WHATSAPP_SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Largest webhook body accepted for signature checking.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Rejects Telegram deliveries whose secret header does not match.
pub async fn telegram_secret(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(channel) = state.telegram.as_ref() else {
        return Err(StatusCode::NOT_FOUND);
    };

    if let Some(expected) = channel.webhook_secret() {
        let provided = request
            .headers()
            .get(TELEGRAM_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !provided.is_some_and(|p| constant_time_eq(p.as_bytes(), expected.as_bytes())) {
            tracing::warn!("telegram webhook rejected: secret token mismatch");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    Ok(next.run(request).await)
}

/// Rejects WhatsApp deliveries whose `X-Hub-Signature-256` does not verify.
///
/// The body is buffered to compute the HMAC and handed on unchanged.
pub async fn whatsapp_signature(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(channel) = state.whatsapp.as_ref() else {
        return Err(StatusCode::NOT_FOUND);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let signature = parts
        .headers
        .get(WHATSAPP_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !channel.verify_signature(signature, &bytes) {
        tracing::warn!("whatsapp webhook rejected: bad signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
