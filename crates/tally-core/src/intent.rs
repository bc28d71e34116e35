// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent taxonomy produced by free-text extraction.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of actions a message can be classified into.
///
/// Anything a model returns outside this set deserializes to [`ActionTag::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionTag {
    AddExpense,
    ViewExpenses,
    ViewSummary,
    DeleteExpense,
    ViewCategories,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    SetBudget,
    AddFundsToCategory,
    ResetCategory,
    ViewPaymentMethods,
    CreatePaymentMethod,
    UpdatePaymentMethod,
    DeletePaymentMethod,
    AddFundsToPaymentMethod,
    PayCreditCard,
    ViewAnalytics,
    ExportData,
    BackupData,
    Help,
    Greeting,
    Menu,
    ConfirmAction,
    CancelAction,
    Unknown,
}

impl ActionTag {
    /// Parses a model-supplied tag, coercing anything unrecognized to `Unknown`.
    pub fn coerce(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Unknown)
    }
}

impl<'de> Deserialize<'de> for ActionTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unknown, Self::coerce))
    }
}

/// A classified message: an action plus whichever slots the model filled.
///
/// Only `action` is guaranteed; every slot must be validated before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default = "unknown_action")]
    pub action: ActionTag,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub allocated_funds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_method_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_method_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub credit_limit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub from_payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub to_payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub period: Option<String>,
}

fn unknown_action() -> ActionTag {
    ActionTag::Unknown
}

impl Intent {
    /// An intent carrying only the action tag.
    pub fn of(action: ActionTag) -> Self {
        Self {
            action,
            amount: None,
            category: None,
            description: None,
            date: None,
            payment_method: None,
            category_name: None,
            category_color: None,
            category_icon: None,
            budget_amount: None,
            allocated_funds: None,
            payment_method_name: None,
            payment_method_type: None,
            credit_limit: None,
            due_date: None,
            from_payment_method: None,
            to_payment_method: None,
            start_date: None,
            end_date: None,
            period: None,
        }
    }

    pub fn unknown() -> Self {
        Self::of(ActionTag::Unknown)
    }

    /// Parses `date` as `YYYY-MM-DD`, ignoring anything else.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_iso_date(self.date.as_deref())
    }

    pub fn parsed_start_date(&self) -> Option<NaiveDate> {
        parse_iso_date(self.start_date.as_deref())
    }

    pub fn parsed_end_date(&self) -> Option<NaiveDate> {
        parse_iso_date(self.end_date.as_deref())
    }
}

/// A tentative expense read from a receipt photo or voice note.
///
/// Category and payment method are never trusted from automatic extraction;
/// `category` is only a suggestion shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
}

impl ExpenseDraft {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_iso_date(self.date.as_deref())
    }
}

fn parse_iso_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

/// Accepts a JSON number or a numeric string (`"45"`, `"$1,200.50"`).
/// Anything else becomes `None` instead of failing the whole intent.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
    .filter(|n: &f64| n.is_finite()))
}

/// Accepts a non-blank string; numbers are stringified, everything else is `None`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("null"))
                .then(|| trimmed.to_string())
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
