// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational core of the Tally expense bot.
//!
//! The [`DialogueController`] receives normalized [`tally_core::ChannelEvent`]s
//! from any channel adapter, drives the per-chat [`Flow`] state machine, and
//! hands confirmed or completed actions to the [`ActionExecutor`].
//!
//! - Free text goes through intent extraction. Mutating intents are always
//!   confirmed before they touch the ledger.
//! - Guided flows (funds, credit card payments, category resets, receipts
//!   and voice notes) advance one button or amount at a time.
//! - Replies are rendered once and adapted to each channel's capabilities
//!   in [`reply::deliver`].

pub mod callback;
pub mod controller;
pub mod executor;
pub mod flow;
pub mod format;
pub mod input;
pub mod keyboards;
pub mod locks;
pub mod reply;
pub mod report;

pub use callback::{Callback, MenuEntry};
pub use controller::DialogueController;
pub use executor::{ActionExecutor, Prepared};
pub use flow::{Flow, NONE_STATE, PendingAction};
pub use reply::{Document, Reply};
pub use report::{Period, Summary};
