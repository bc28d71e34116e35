// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the expense ledger and per-chat conversation state.

use async_trait::async_trait;

use crate::error::TallyError;
use crate::records::{
    Category, CategoryFunding, CategoryReset, ConversationRecord, DateRange, Expense,
    NewCategory, NewExpense, NewPaymentMethod, PaymentFunding, PaymentMethod,
};

/// The ledger operations the dialogue engine consumes.
///
/// Every mutation is atomic: balance bookkeeping happens inside the
/// implementation, and callers never attempt partial rollback.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    async fn list_categories(&self) -> Result<Vec<Category>, TallyError>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>, TallyError>;
    /// Case-insensitive, trimmed lookup.
    async fn find_category(&self, name: &str) -> Result<Option<Category>, TallyError>;
    async fn create_category(&self, category: NewCategory) -> Result<Category, TallyError>;

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, TallyError>;
    async fn get_payment_method(&self, id: i64) -> Result<Option<PaymentMethod>, TallyError>;
    /// Case-insensitive, trimmed lookup.
    async fn find_payment_method(&self, name: &str) -> Result<Option<PaymentMethod>, TallyError>;
    async fn create_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, TallyError>;

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, TallyError>;
    /// Expenses in the range, newest first.
    async fn list_expenses(&self, range: DateRange) -> Result<Vec<Expense>, TallyError>;
    /// Deletes an expense and reverses its balance effects.
    async fn delete_expense(&self, id: i64) -> Result<Expense, TallyError>;

    async fn add_category_funds(
        &self,
        category_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<CategoryFunding, TallyError>;

    /// Adds `amount` to a payment method balance. A negative amount is a
    /// payment or withdrawal.
    async fn add_payment_method_funds(
        &self,
        payment_method_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<PaymentFunding, TallyError>;

    async fn reset_category(&self, category_id: i64) -> Result<CategoryReset, TallyError>;
}

/// Per-chat conversation state persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    async fn get_user_state(&self, chat_id: &str)
    -> Result<Option<ConversationRecord>, TallyError>;

    /// Upserts the state, fully replacing any previous data.
    async fn set_user_state(
        &self,
        chat_id: &str,
        state: &str,
        data: Option<serde_json::Value>,
    ) -> Result<(), TallyError>;

    /// Deletes the state. Clearing an absent state is a no-op.
    async fn clear_user_state(&self, chat_id: &str) -> Result<(), TallyError>;
}
