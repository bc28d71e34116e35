// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed conversation states.
//!
//! A [`Flow`] is what the store persists as `{state, data}`. The state name
//! doubles as the program counter of a guided flow; the payload carries the
//! slots collected so far. Records that fail to decode are treated as if no
//! flow were active, so a schema change can never wedge a chat.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::{ConversationRecord, ExpenseDraft, PaymentKind, TallyError};

/// Sentinel state name meaning "no active flow".
pub const NONE_STATE: &str = "none";

/// A fully-resolved action waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum PendingAction {
    AddExpense {
        amount: f64,
        category: String,
        payment_method: String,
        description: Option<String>,
        date: NaiveDate,
    },
    CreateCategory {
        name: String,
        color: Option<String>,
        icon: Option<String>,
        budget_amount: Option<f64>,
        allocated_funds: Option<f64>,
    },
    CreatePaymentMethod {
        name: String,
        kind: PaymentKind,
        credit_limit: Option<f64>,
        due_date: Option<String>,
    },
    /// Read from a receipt photo; category and payment are re-selected on confirm.
    AddExpenseFromReceipt(ExpenseDraft),
    /// Read from a voice note; category and payment are re-selected on confirm.
    AddExpenseFromVoice(ExpenseDraft),
}

impl PendingAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddExpense { .. } => "add_expense",
            Self::CreateCategory { .. } => "create_category",
            Self::CreatePaymentMethod { .. } => "create_payment_method",
            Self::AddExpenseFromReceipt(_) => "add_expense_from_receipt",
            Self::AddExpenseFromVoice(_) => "add_expense_from_voice",
        }
    }
}

/// Where an expense draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Receipt,
    Voice,
}

/// The state of one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "state",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Flow {
    AwaitingConfirmation(PendingAction),

    AddExpenseSelectCategory,
    AddExpenseSelectPayment {
        category_id: i64,
        category_name: String,
    },
    AddExpenseAmount {
        category_id: i64,
        category_name: String,
        payment_method_id: i64,
        payment_method_name: String,
    },
    AddExpenseDescription {
        category_id: i64,
        category_name: String,
        payment_method_id: i64,
        payment_method_name: String,
        amount: f64,
    },

    SelectCategoryForFund,
    AddFundCategoryAmount {
        category_id: i64,
        category_name: String,
    },
    SelectDebitForFund,
    AddFundDebitAmount {
        payment_method_id: i64,
        payment_method_name: String,
    },
    AddFundCashAmount {
        payment_method_id: i64,
        payment_method_name: String,
    },

    SelectCategoryToReset,
    ConfirmCategoryReset {
        category_id: i64,
        category_name: String,
    },

    SelectCreditForPayment,
    PayCreditAmount {
        payment_method_id: i64,
        payment_method_name: String,
    },

    AwaitingReceiptCategoryFirst {
        draft: ExpenseDraft,
    },
    AwaitingReceiptPayment {
        draft: ExpenseDraft,
        category_id: i64,
        category_name: String,
    },
    AwaitingVoiceCategoryFirst {
        draft: ExpenseDraft,
    },
    AwaitingVoicePayment {
        draft: ExpenseDraft,
        category_id: i64,
        category_name: String,
    },
}

impl Flow {
    /// The persisted state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingConfirmation(_) => "awaiting_confirmation",
            Self::AddExpenseSelectCategory => "add_expense_select_category",
            Self::AddExpenseSelectPayment { .. } => "add_expense_select_payment",
            Self::AddExpenseAmount { .. } => "add_expense_amount",
            Self::AddExpenseDescription { .. } => "add_expense_description",
            Self::SelectCategoryForFund => "select_category_for_fund",
            Self::AddFundCategoryAmount { .. } => "add_fund_category_amount",
            Self::SelectDebitForFund => "select_debit_for_fund",
            Self::AddFundDebitAmount { .. } => "add_fund_debit_amount",
            Self::AddFundCashAmount { .. } => "add_fund_cash_amount",
            Self::SelectCategoryToReset => "select_category_to_reset",
            Self::ConfirmCategoryReset { .. } => "confirm_category_reset",
            Self::SelectCreditForPayment => "select_credit_for_payment",
            Self::PayCreditAmount { .. } => "pay_credit_amount",
            Self::AwaitingReceiptCategoryFirst { .. } => "awaiting_receipt_category_first",
            Self::AwaitingReceiptPayment { .. } => "awaiting_receipt_payment",
            Self::AwaitingVoiceCategoryFirst { .. } => "awaiting_voice_category_first",
            Self::AwaitingVoicePayment { .. } => "awaiting_voice_payment",
        }
    }

    /// Steps that expect a typed amount.
    pub fn expects_amount(&self) -> bool {
        matches!(
            self,
            Self::AddExpenseAmount { .. }
                | Self::AddFundCategoryAmount { .. }
                | Self::AddFundDebitAmount { .. }
                | Self::AddFundCashAmount { .. }
                | Self::PayCreditAmount { .. }
        )
    }

    /// Steps answered with a category button.
    pub fn selects_category(&self) -> bool {
        matches!(
            self,
            Self::AddExpenseSelectCategory
                | Self::SelectCategoryForFund
                | Self::SelectCategoryToReset
                | Self::AwaitingReceiptCategoryFirst { .. }
                | Self::AwaitingVoiceCategoryFirst { .. }
        )
    }

    /// Steps answered with a payment method button.
    pub fn selects_payment_method(&self) -> bool {
        matches!(
            self,
            Self::AddExpenseSelectPayment { .. }
                | Self::SelectDebitForFund
                | Self::SelectCreditForPayment
                | Self::AwaitingReceiptPayment { .. }
                | Self::AwaitingVoicePayment { .. }
        )
    }

    /// Split into the store's `(state, data)` pair.
    pub fn to_parts(&self) -> Result<(&'static str, Option<serde_json::Value>), TallyError> {
        let mut value = serde_json::to_value(self)?;
        let data = value.as_object_mut().and_then(|obj| obj.remove("data"));
        Ok((self.name(), data))
    }

    /// Decode a stored record. `None` for the `none` sentinel, unknown state
    /// names, and payloads that no longer match their state.
    pub fn from_record(record: &ConversationRecord) -> Option<Self> {
        if record.state == NONE_STATE {
            return None;
        }
        let mut object = serde_json::Map::new();
        object.insert(
            "state".to_string(),
            serde_json::Value::String(record.state.clone()),
        );
        if let Some(data) = &record.data {
            object.insert("data".to_string(), data.clone());
        }
        serde_json::from_value(serde_json::Value::Object(object)).ok()
    }
}
