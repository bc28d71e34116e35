// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction for intent classification.

use chrono::NaiveDate;
use strum::IntoEnumIterator;
use tally_core::{ActionTag, CompletionRequest};

/// Names known to the ledger, passed to the model as disambiguation hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionContext {
    pub today: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl ExtractionContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Some(today),
            ..Self::default()
        }
    }
}

const MAX_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = "You classify messages sent to a personal expense-tracking bot.
Reply with a single JSON object and nothing else.

The object must contain \"action\", one of:
{actions}

Include only the fields the message actually supplies:
- amount (number), category, description, date (YYYY-MM-DD), paymentMethod
- categoryName, categoryColor, categoryIcon, budgetAmount, allocatedFunds
- paymentMethodName, paymentMethodType (cash|debit|credit), creditLimit, dueDate
- fromPaymentMethod, toPaymentMethod
- startDate, endDate (YYYY-MM-DD), period (today|week|month|year)

Rules:
- \"spent 12 on coffee\" is add_expense with amount 12 and description \"coffee\".
- Match category and payment method names to the known names when they clearly refer to one.
- Use create_category or create_payment_method only when the user asks to add one; put the new name in categoryName or paymentMethodName.
- yes/ok/sure is confirm_action; no/stop/nevermind is cancel_action.
- If nothing fits, use unknown.";

/// Build the classification request for a message.
pub fn build_request(text: &str, context: &ExtractionContext) -> CompletionRequest {
    let actions = ActionTag::iter()
        .map(|tag| tag.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    if let Some(today) = context.today {
        prompt.push_str(&format!("Today is {today}.\n"));
    }
    if !context.categories.is_empty() {
        prompt.push_str(&format!(
            "Known categories: {}\n",
            context.categories.join(", ")
        ));
    }
    if !context.payment_methods.is_empty() {
        prompt.push_str(&format!(
            "Known payment methods: {}\n",
            context.payment_methods.join(", ")
        ));
    }
    prompt.push_str(&format!("Message: {text}"));

    CompletionRequest {
        system: SYSTEM_PROMPT.replace("{actions}", &actions),
        prompt,
        max_tokens: MAX_TOKENS,
    }
}
