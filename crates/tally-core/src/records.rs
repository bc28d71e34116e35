// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger records exchanged with the storage layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A spending category with its budget and running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub budget_amount: f64,
    pub allocated_funds: f64,
    pub balance: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub budget_amount: Option<f64>,
    pub allocated_funds: Option<f64>,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Kind of payment method. Credit balances are outstanding debt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaymentKind {
    Cash,
    Debit,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub kind: PaymentKind,
    pub balance: f64,
    pub credit_limit: Option<f64>,
    pub due_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentMethod {
    pub name: String,
    pub kind: PaymentKind,
    pub balance: f64,
    pub credit_limit: Option<f64>,
    pub due_date: Option<String>,
}

impl NewPaymentMethod {
    pub fn new(name: impl Into<String>, kind: PaymentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            balance: 0.0,
            credit_limit: None,
            due_date: None,
        }
    }
}

/// A recorded expense. Category and payment method are stored by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub amount: f64,
    pub category: String,
    pub payment_method: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: f64,
    pub category: String,
    pub payment_method: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Which ledger entity a fund movement applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FundTarget {
    Category,
    PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHistory {
    pub id: i64,
    pub target: FundTarget,
    pub target_id: i64,
    pub amount: f64,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFunding {
    pub history: FundHistory,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentFunding {
    pub history: FundHistory,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReset {
    pub deleted_expenses: usize,
    pub deleted_fund_history: usize,
    pub category: Category,
}

/// Inclusive date bounds for expense queries. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Raw persisted conversation state row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub chat_id: String,
    pub state: String,
    pub data: Option<serde_json::Value>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
