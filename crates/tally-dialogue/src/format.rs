// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message text. Uses the lightweight `*bold*` / `_italic_` markup that
//! both channels render.

use std::fmt::Write as _;

use tally_core::{Category, Expense, PaymentKind, PaymentMethod};

use crate::flow::PendingAction;
use crate::report::{Period, Summary, budget_usage};

/// Format an amount with the configured currency symbol.
pub fn money(symbol: &str, amount: f64) -> String {
    if amount < 0.0 {
        format!("-{symbol}{:.2}", amount.abs())
    } else {
        format!("{symbol}{amount:.2}")
    }
}

pub const WELCOME: &str = "👋 *Hi!* I track your expenses.\n\
Tell me what you spent (\"spent 12 on lunch\"), send a receipt photo or a voice note, or pick an option below.";

pub const HELP: &str = "*How to use me*\n\
• Type an expense: _spent 45 on groceries with Visa_\n\
• Ask for reports: _summary this week_, _show my expenses_\n\
• Create things: _add category Travel_, _new credit card Amex_\n\
• Send a receipt photo or a voice note to log it\n\
• Use the menu for funds, card payments and resets\n\
• Type *cancel* at any time to stop what we're doing";

pub const FALLBACK: &str = "🤔 I didn't understand that. Try \"spent 20 on taxi\" or pick an option below.";

pub const CANCELLED: &str = "Cancelled. What would you like to do?";

pub const EXPIRED: &str = "That menu has expired. Here's the main menu.";

pub const FAILURE: &str = "⚠️ Something went wrong and nothing was saved. Please try again.";

pub const MEDIA_DISABLED: &str = "📷 Reading photos and voice notes isn't set up for this bot. Please type the expense instead.";

pub const MISSING_AMOUNT: &str = "How much was it? Please include the amount, e.g. \"spent 12.50 on coffee\".";

pub const INVALID_AMOUNT: &str = "Invalid amount. Please send a positive number like 25 or 12.50.";

pub fn guided_only(action: &str) -> String {
    format!("To {action}, please use the menu below so you can pick exactly what to change.")
}

pub fn confirmation_prompt(symbol: &str, pending: &PendingAction) -> String {
    match pending {
        PendingAction::AddExpense {
            amount,
            category,
            payment_method,
            description,
            date,
        } => {
            let mut text = format!(
                "Add *{}* to *{category}* with {payment_method}",
                money(symbol, *amount)
            );
            if let Some(description) = description {
                let _ = write!(text, " for _{description}_");
            }
            let _ = write!(text, " on {date}?");
            text
        }
        PendingAction::CreateCategory {
            name,
            budget_amount,
            ..
        } => match budget_amount {
            Some(budget) => format!(
                "Create category *{name}* with a budget of {}?",
                money(symbol, *budget)
            ),
            None => format!("Create category *{name}*?"),
        },
        PendingAction::CreatePaymentMethod {
            name,
            kind,
            credit_limit,
            ..
        } => match credit_limit {
            Some(limit) => format!(
                "Create {kind} payment method *{name}* with a limit of {}?",
                money(symbol, *limit)
            ),
            None => format!("Create {kind} payment method *{name}*?"),
        },
        PendingAction::AddExpenseFromReceipt(draft) | PendingAction::AddExpenseFromVoice(draft) => {
            let source = if matches!(pending, PendingAction::AddExpenseFromReceipt(_)) {
                "🧾 From your receipt"
            } else {
                "🎤 From your voice note"
            };
            let mut text = format!("{source}:\nAmount: *{}*", money(symbol, draft.amount.unwrap_or_default()));
            if let Some(description) = &draft.description {
                let _ = write!(text, "\nDescription: {description}");
            }
            if let Some(category) = &draft.category {
                let _ = write!(text, "\nSuggested category: {category}");
            }
            if let Some(date) = draft.parsed_date() {
                let _ = write!(text, "\nDate: {date}");
            }
            text.push_str("\n\nConfirm to choose the category and payment method.");
            text
        }
    }
}

pub fn categories(symbol: &str, categories: &[Category]) -> String {
    if categories.is_empty() {
        return "You have no categories yet. Try \"add category Food\".".to_string();
    }
    let mut text = String::from("*Categories*\n");
    for c in categories {
        let _ = write!(text, "\n{} *{}*: {}", c.icon, c.name, money(symbol, c.balance));
        if c.budget_amount > 0.0 {
            let _ = write!(text, " of {} budget", money(symbol, c.budget_amount));
        }
    }
    text
}

pub fn payment_methods(symbol: &str, methods: &[PaymentMethod]) -> String {
    if methods.is_empty() {
        return "You have no payment methods yet. Try \"add debit card Checking\".".to_string();
    }
    let mut text = String::from("*Payment methods*\n");
    for m in methods {
        match m.kind {
            PaymentKind::Credit => {
                let _ = write!(text, "\n💳 *{}* (credit): owed {}", m.name, money(symbol, m.balance));
                if let Some(limit) = m.credit_limit {
                    let _ = write!(text, " of {}", money(symbol, limit));
                }
            }
            kind => {
                let _ = write!(text, "\n🏦 *{}* ({kind}): {}", m.name, money(symbol, m.balance));
            }
        }
    }
    text
}

pub fn expense_line(symbol: &str, e: &Expense) -> String {
    let mut line = format!("{} *{}* {}", e.date, money(symbol, e.amount), e.category);
    if let Some(description) = &e.description {
        let _ = write!(line, ", _{description}_");
    }
    let _ = write!(line, " ({})", e.payment_method);
    line
}

pub fn recent_expenses(symbol: &str, expenses: &[Expense], period: &Period, limit: usize) -> String {
    if expenses.is_empty() {
        return format!("No expenses {}.", period.label);
    }
    let mut text = format!("*Expenses {}*\n", period.label);
    for e in expenses.iter().take(limit) {
        let _ = write!(text, "\n{}", expense_line(symbol, e));
    }
    if expenses.len() > limit {
        let _ = write!(text, "\n\n_…and {} more_", expenses.len() - limit);
    }
    text
}

pub fn summary(symbol: &str, summary: &Summary, period: &Period) -> String {
    if summary.count == 0 {
        return format!("No expenses {}.", period.label);
    }
    let mut text = format!(
        "📊 *Summary {}*\n\nTotal: *{}* across {} expenses\nDaily average: {}",
        period.label,
        money(symbol, summary.total),
        summary.count,
        money(symbol, summary.daily_average)
    );
    if let Some((name, amount)) = summary.top_category() {
        let _ = write!(text, "\nTop category: {name} ({})", money(symbol, *amount));
    }
    text.push_str("\n\n*By category*");
    for (name, amount) in &summary.by_category {
        let _ = write!(text, "\n• {name}: {}", money(symbol, *amount));
    }
    text.push_str("\n\n*By payment method*");
    for (name, amount) in &summary.by_payment_method {
        let _ = write!(text, "\n• {name}: {}", money(symbol, *amount));
    }
    text
}

/// Summary plus budget usage per category.
pub fn analytics(symbol: &str, s: &Summary, period: &Period, categories: &[Category]) -> String {
    let mut text = summary(symbol, s, period);
    let budgeted: Vec<_> = categories.iter().filter(|c| c.budget_amount > 0.0).collect();
    if s.count == 0 || budgeted.is_empty() {
        return text;
    }
    text.push_str("\n\n*Budget usage*");
    for category in budgeted {
        let spent = s
            .by_category
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&category.name))
            .map_or(0.0, |(_, amount)| *amount);
        if let Some(pct) = budget_usage(category, spent) {
            let flag = if pct > 100.0 { " ⚠️" } else { "" };
            let _ = write!(text, "\n• {}: {pct:.0}%{flag}", category.name);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn money_formats_two_decimals() {
        assert_eq!(money("$", 45.0), "$45.00");
        assert_eq!(money("€", 0.5), "€0.50");
        assert_eq!(money("$", -12.5), "-$12.50");
    }

    #[test]
    fn expense_confirmation_mentions_every_slot() {
        let text = confirmation_prompt(
            "$",
            &PendingAction::AddExpense {
                amount: 45.0,
                category: "Uncategorized".into(),
                payment_method: "Telegram".into(),
                description: Some("lunch".into()),
                date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            },
        );
        for part in ["$45.00", "Uncategorized", "Telegram", "lunch", "2026-03-01"] {
            assert!(text.contains(part), "missing {part} in {text}");
        }
    }

    #[test]
    fn recent_list_is_capped() {
        let period = Period::this_month(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        let expenses: Vec<_> = (1..=4)
            .map(|day| Expense {
                id: day,
                amount: 1.0,
                category: "Food".into(),
                payment_method: "Cash".into(),
                description: None,
                date: NaiveDate::from_ymd_opt(2026, 3, day as u32).unwrap(),
                created_at: String::new(),
            })
            .collect();
        let text = recent_expenses("$", &expenses, &period, 2);
        assert!(text.contains("and 2 more"));
        assert_eq!(text.matches("Food").count(), 2);
    }
}
