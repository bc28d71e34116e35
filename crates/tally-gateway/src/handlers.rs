// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook endpoints.
//!
//! Webhook handlers normalize the body, hand the events to the dialogue
//! controller on a tracked background task, and answer `200` immediately.
//! Platforms redeliver on non-2xx responses, so normalization failures are
//! logged and still acknowledged.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tally_core::{ChannelAdapter, ChannelEvent, PluginAdapter};
use tally_dialogue::DialogueController;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub telegram: bool,
    pub whatsapp: bool,
}

/// Query string of the WhatsApp verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        telegram: state.telegram.as_ref().is_some_and(|c| c.is_enabled()),
        whatsapp: state.whatsapp.as_ref().is_some_and(|c| c.is_enabled()),
    })
}

/// POST /telegram/webhook
pub async fn post_telegram(State(state): State<GatewayState>, body: Bytes) -> StatusCode {
    let Some(channel) = state.telegram.clone() else {
        return StatusCode::NOT_FOUND;
    };
    dispatch(&state, channel, &body).await;
    StatusCode::OK
}

/// GET /whatsapp/webhook
pub async fn verify_whatsapp(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let Some(channel) = state.whatsapp.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match channel.verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
    ) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => {
            warn!("whatsapp verification handshake rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /whatsapp/webhook
pub async fn post_whatsapp(State(state): State<GatewayState>, body: Bytes) -> StatusCode {
    let Some(channel) = state.whatsapp.clone() else {
        return StatusCode::NOT_FOUND;
    };
    dispatch(&state, channel, &body).await;
    StatusCode::OK
}

/// Normalizes `body` and handles its events in order on a background task.
async fn dispatch<C: ChannelAdapter>(state: &GatewayState, channel: Arc<C>, body: &[u8]) {
    let events = match channel.normalize_inbound(body).await {
        Ok(events) => events,
        Err(e) => {
            warn!(channel = channel.name(), error = %e, "failed to normalize webhook");
            return;
        }
    };
    if events.is_empty() {
        debug!(channel = channel.name(), "webhook carried no events");
        return;
    }

    let controller = Arc::clone(&state.controller);
    state.tasks.spawn(handle_all(controller, channel, events));
}

async fn handle_all<C: ChannelAdapter>(
    controller: Arc<DialogueController>,
    channel: Arc<C>,
    events: Vec<ChannelEvent>,
) {
    for event in events {
        controller.handle(channel.as_ref(), event).await;
    }
}
