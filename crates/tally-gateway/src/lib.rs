// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Tally expense bot.
//!
//! Exposes one webhook per messaging platform plus a health endpoint. Each
//! delivery is normalized by its channel adapter and handed to the shared
//! [`DialogueController`](tally_dialogue::DialogueController).

pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{GatewayState, router, start_server};
