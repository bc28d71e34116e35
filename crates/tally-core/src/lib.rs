// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tally expense bot.
//!
//! This crate provides the error type, the domain records exchanged with
//! storage, the intent taxonomy, and the adapter traits that channels,
//! providers, and stores implement.

pub mod error;
pub mod intent;
pub mod records;
pub mod traits;
pub mod types;

pub use error::TallyError;
pub use intent::{ActionTag, ExpenseDraft, Intent};
pub use records::{
    Category, CategoryFunding, CategoryReset, ConversationRecord, DateRange, Expense,
    FundHistory, FundTarget, NewCategory, NewExpense, NewPaymentMethod, PaymentFunding,
    PaymentKind, PaymentMethod,
};
pub use types::{
    AdapterType, Button, ChannelCapabilities, ChannelEvent, ChatId, CompletionRequest,
    CompletionResponse, HealthStatus, Keyboard, ListRow, ListSection, MediaPayload, StateKey,
};

pub use traits::{
    ChannelAdapter, ConversationStore, LedgerStore, MediaReader, PluginAdapter, ProviderAdapter,
};
