// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only reports: period resolution, spending summaries, exports.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tally_core::{Category, DateRange, Expense, Intent, PaymentMethod, TallyError};

/// A resolved reporting window. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl Period {
    pub fn range(&self) -> DateRange {
        DateRange::between(self.start, self.end)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn this_month(today: NaiveDate) -> Self {
        Self {
            start: today.with_day(1).unwrap_or(today),
            end: today,
            label: "this month".to_string(),
        }
    }

    /// Resolve an intent's `startDate`/`endDate` or `period` slot.
    /// Defaults to the current month.
    pub fn from_intent(intent: &Intent, today: NaiveDate) -> Self {
        let start = intent.parsed_start_date();
        let end = intent.parsed_end_date();
        if start.is_some() || end.is_some() {
            let start = start.unwrap_or_else(|| Self::this_month(today).start);
            let end = end.unwrap_or(today).max(start);
            return Self {
                start,
                end,
                label: format!("{start} to {end}"),
            };
        }

        match intent.period.as_deref().map(str::to_lowercase).as_deref() {
            Some("today") | Some("day") => Self {
                start: today,
                end: today,
                label: "today".to_string(),
            },
            Some("week") | Some("this week") => Self {
                start: today - Duration::days(i64::from(today.weekday().num_days_from_monday())),
                end: today,
                label: "this week".to_string(),
            },
            Some("year") | Some("this year") => Self {
                start: today.with_ordinal(1).unwrap_or(today),
                end: today,
                label: "this year".to_string(),
            },
            _ => Self::this_month(today),
        }
    }
}

/// Spending totals over a period.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: f64,
    pub count: usize,
    /// Sorted by amount, largest first.
    pub by_category: Vec<(String, f64)>,
    /// Sorted by amount, largest first.
    pub by_payment_method: Vec<(String, f64)>,
    pub daily_average: f64,
}

impl Summary {
    pub fn compute(expenses: &[Expense], period: &Period) -> Self {
        let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
        let mut by_payment: BTreeMap<&str, f64> = BTreeMap::new();
        let mut total = 0.0;
        for expense in expenses {
            total += expense.amount;
            *by_category.entry(expense.category.as_str()).or_default() += expense.amount;
            *by_payment.entry(expense.payment_method.as_str()).or_default() += expense.amount;
        }

        Self {
            total,
            count: expenses.len(),
            by_category: sorted_desc(by_category),
            by_payment_method: sorted_desc(by_payment),
            daily_average: total / period.days().max(1) as f64,
        }
    }

    pub fn top_category(&self) -> Option<&(String, f64)> {
        self.by_category.first()
    }
}

fn sorted_desc(totals: BTreeMap<&str, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(name, amount)| (name.to_string(), amount))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries
}

/// Budget usage of a category, in percent. `None` without a budget.
pub fn budget_usage(category: &Category, spent: f64) -> Option<f64> {
    (category.budget_amount > 0.0).then(|| spent / category.budget_amount * 100.0)
}

#[derive(Serialize)]
struct ExportRow<'a> {
    date: NaiveDate,
    amount: f64,
    category: &'a str,
    payment_method: &'a str,
    description: &'a str,
}

/// Expenses as CSV, oldest first.
pub fn export_csv(expenses: &[Expense]) -> Result<Vec<u8>, TallyError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for expense in expenses.iter().rev() {
        writer
            .serialize(ExportRow {
                date: expense.date,
                amount: expense.amount,
                category: &expense.category,
                payment_method: &expense.payment_method,
                description: expense.description.as_deref().unwrap_or_default(),
            })
            .map_err(|e| TallyError::Internal(format!("CSV export failed: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| TallyError::Internal(format!("CSV export failed: {e}")))
}

pub fn export_filename(period: &Period) -> String {
    format!("expenses-{}-{}.csv", period.start, period.end)
}

#[derive(Serialize)]
struct Backup<'a> {
    generated_on: NaiveDate,
    categories: &'a [Category],
    payment_methods: &'a [PaymentMethod],
    expenses: &'a [Expense],
}

/// A JSON snapshot of the whole ledger.
pub fn backup_json(
    today: NaiveDate,
    categories: &[Category],
    payment_methods: &[PaymentMethod],
    expenses: &[Expense],
) -> Result<Vec<u8>, TallyError> {
    Ok(serde_json::to_vec_pretty(&Backup {
        generated_on: today,
        categories,
        payment_methods,
        expenses,
    })?)
}
