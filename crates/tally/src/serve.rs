// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally serve` command implementation.
//!
//! Opens SQLite storage, builds the intent provider chain and media reader
//! from config, wires the dialogue controller to the Telegram and WhatsApp
//! channels, and serves their webhooks until SIGINT or SIGTERM.

use std::sync::Arc;

use tally_config::model::TallyConfig;
use tally_core::{ChannelAdapter, HealthStatus, TallyError};
use tally_dialogue::DialogueController;
use tally_gateway::{GatewayState, start_server};
use tally_storage::SqliteStore;
use tally_telegram::TelegramChannel;
use tally_whatsapp::WhatsAppChannel;
use tracing::{debug, error, info, warn};

/// Storage plus the controller driving it, shared by `serve` and `shell`.
pub(crate) struct Stack {
    pub store: Arc<SqliteStore>,
    pub controller: Arc<DialogueController>,
}

/// Opens storage and assembles the dialogue controller described by `config`.
pub(crate) async fn build_stack(config: &TallyConfig) -> Result<Stack, TallyError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await.inspect_err(|e| {
        error!(error = %e, path = %config.storage.database_path, "failed to open storage");
    })?;

    let extractor = tally_intent::build_extractor(&config.intent)?;
    if extractor.provider_count() == 0 {
        info!("no intent providers configured, free text falls back to the guided menus");
    }

    let mut controller = DialogueController::new(
        store.clone(),
        store.clone(),
        Arc::new(extractor),
        config.dialogue.clone(),
    );
    match tally_intent::build_media_reader(&config.media)? {
        Some(reader) => {
            info!(
                vision = %config.media.vision_model,
                transcription = %config.media.transcription_model,
                "media reading enabled"
            );
            controller = controller.with_media_reader(reader);
        }
        None => debug!("media reading disabled by configuration"),
    }

    Ok(Stack {
        store,
        controller: Arc::new(controller),
    })
}

/// Runs the `tally serve` command.
pub async fn run_serve(config: TallyConfig) -> Result<(), TallyError> {
    info!(name = %config.bot.name, "starting tally serve");

    let stack = build_stack(&config).await?;
    let mut state = GatewayState::new(stack.controller.clone());

    let telegram = TelegramChannel::new(config.telegram.clone());
    if telegram.is_enabled() {
        report_health(&telegram).await;
        state = state.with_telegram(Arc::new(telegram));
    } else if config.telegram.webhook_secret.is_some() {
        // Keep the route so Telegram gets a 200 instead of retrying into a 404.
        warn!("telegram webhook secret set without a bot token, replies are disabled");
        state = state.with_telegram(Arc::new(telegram));
    }

    let whatsapp = WhatsAppChannel::new(config.whatsapp.clone());
    if whatsapp.is_enabled() {
        report_health(&whatsapp).await;
        state = state.with_whatsapp(Arc::new(whatsapp));
    } else if config.whatsapp.verify_token.is_some() {
        warn!("whatsapp verify token set without send credentials, replies are disabled");
        state = state.with_whatsapp(Arc::new(whatsapp));
    }

    if state.telegram.is_none() && state.whatsapp.is_none() {
        warn!("no channel configured, only /health will answer");
    }

    start_server(&config.gateway, state, shutdown_signal()).await?;

    info!("tally serve stopped");
    Ok(())
}

/// Logs a channel's startup health without failing the boot.
async fn report_health(channel: &dyn ChannelAdapter) {
    match channel.health_check().await {
        Ok(HealthStatus::Healthy) => info!(channel = channel.name(), "channel ready"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(channel = channel.name(), %reason, "channel not healthy")
        }
        Err(e) => warn!(channel = channel.name(), error = %e, "channel health check failed"),
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        _ = terminate => info!("received SIGTERM, initiating shutdown"),
    }
}
