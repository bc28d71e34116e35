// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action handlers: validate slots, call the ledger, format the result.
//!
//! Each handler treats a ledger call as one logical unit; balance
//! bookkeeping and its atomicity belong to the store.

use std::sync::Arc;

use chrono::NaiveDate;
use tally_config::model::DialogueConfig;
use tally_core::{
    ActionTag, Category, DateRange, Intent, LedgerStore, NewCategory, NewExpense, NewPaymentMethod,
    PaymentKind, PaymentMethod, TallyError,
};
use tracing::info;

use crate::flow::PendingAction;
use crate::format::{self, money};
use crate::reply::{Document, Reply};
use crate::report::{self, Period, Summary};

/// Result of turning a free-text intent into something confirmable.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Ready(PendingAction),
    /// A required slot is missing or invalid; the text asks for it.
    Missing(String),
}

/// Runs actions against the ledger.
pub struct ActionExecutor {
    ledger: Arc<dyn LedgerStore>,
    settings: DialogueConfig,
}

impl ActionExecutor {
    pub fn new(ledger: Arc<dyn LedgerStore>, settings: DialogueConfig) -> Self {
        Self { ledger, settings }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    fn symbol(&self) -> &str {
        &self.settings.currency_symbol
    }

    // --- Free text -> pending action ---

    /// Build a pending action from an extracted intent.
    ///
    /// Names are matched against existing rows so the confirmation shows the
    /// canonical spelling. Nothing is written.
    pub async fn prepare(
        &self,
        intent: &Intent,
        default_payment_method: &str,
        today: NaiveDate,
    ) -> Result<Prepared, TallyError> {
        match intent.action {
            ActionTag::AddExpense => {
                let Some(amount) = intent.amount.filter(|a| *a > 0.0) else {
                    return Ok(Prepared::Missing(format::MISSING_AMOUNT.to_string()));
                };
                let category = match &intent.category {
                    Some(name) => self.canonical_category(name).await?,
                    None => self.settings.default_category.clone(),
                };
                let payment_method = match &intent.payment_method {
                    Some(name) => self.canonical_payment_method(name).await?,
                    None => default_payment_method.to_string(),
                };
                Ok(Prepared::Ready(PendingAction::AddExpense {
                    amount,
                    category,
                    payment_method,
                    description: intent.description.clone(),
                    date: intent.parsed_date().unwrap_or(today),
                }))
            }
            ActionTag::CreateCategory => {
                let Some(name) = intent.category_name.as_ref().or(intent.category.as_ref()) else {
                    return Ok(Prepared::Missing(
                        "What should the new category be called? Try \"add category Travel\"."
                            .to_string(),
                    ));
                };
                if let Some(existing) = self.ledger.find_category(name).await? {
                    return Ok(Prepared::Missing(format!(
                        "A category named *{}* already exists.",
                        existing.name
                    )));
                }
                Ok(Prepared::Ready(PendingAction::CreateCategory {
                    name: name.clone(),
                    color: intent.category_color.clone(),
                    icon: intent.category_icon.clone(),
                    budget_amount: intent.budget_amount.filter(|a| *a >= 0.0),
                    allocated_funds: intent.allocated_funds.filter(|a| *a >= 0.0),
                }))
            }
            ActionTag::CreatePaymentMethod => {
                let Some(name) = intent
                    .payment_method_name
                    .as_ref()
                    .or(intent.payment_method.as_ref())
                else {
                    return Ok(Prepared::Missing(
                        "What should the payment method be called? Try \"add credit card Amex\"."
                            .to_string(),
                    ));
                };
                if let Some(existing) = self.ledger.find_payment_method(name).await? {
                    return Ok(Prepared::Missing(format!(
                        "A payment method named *{}* already exists.",
                        existing.name
                    )));
                }
                let kind = intent
                    .payment_method_type
                    .as_deref()
                    .and_then(|k| k.parse::<PaymentKind>().ok())
                    .unwrap_or(if intent.credit_limit.is_some() {
                        PaymentKind::Credit
                    } else {
                        PaymentKind::Debit
                    });
                Ok(Prepared::Ready(PendingAction::CreatePaymentMethod {
                    name: name.clone(),
                    kind,
                    credit_limit: intent.credit_limit.filter(|_| kind == PaymentKind::Credit),
                    due_date: intent.due_date.clone(),
                }))
            }
            other => Err(TallyError::Internal(format!(
                "{other} is not a confirmable action"
            ))),
        }
    }

    async fn canonical_category(&self, name: &str) -> Result<String, TallyError> {
        Ok(self
            .ledger
            .find_category(name)
            .await?
            .map_or_else(|| name.trim().to_string(), |c| c.name))
    }

    async fn canonical_payment_method(&self, name: &str) -> Result<String, TallyError> {
        Ok(self
            .ledger
            .find_payment_method(name)
            .await?
            .map_or_else(|| name.trim().to_string(), |m| m.name))
    }

    // --- Mutations ---

    /// Execute a confirmed action. Drafts from media are not executable
    /// until category and payment method are chosen.
    pub async fn execute(&self, pending: &PendingAction) -> Result<Reply, TallyError> {
        match pending {
            PendingAction::AddExpense {
                amount,
                category,
                payment_method,
                description,
                date,
            } => {
                self.add_expense(NewExpense {
                    amount: *amount,
                    category: category.clone(),
                    payment_method: payment_method.clone(),
                    description: description.clone(),
                    date: *date,
                })
                .await
            }
            PendingAction::CreateCategory {
                name,
                color,
                icon,
                budget_amount,
                allocated_funds,
            } => {
                let category = self
                    .ledger
                    .create_category(NewCategory {
                        name: name.clone(),
                        color: color.clone(),
                        icon: icon.clone(),
                        budget_amount: *budget_amount,
                        allocated_funds: *allocated_funds,
                    })
                    .await?;
                info!(category = %category.name, "category created");
                Ok(Reply::text(format!("✅ Category *{}* created.", category.name)).with_menu())
            }
            PendingAction::CreatePaymentMethod {
                name,
                kind,
                credit_limit,
                due_date,
            } => {
                let mut new = NewPaymentMethod::new(name.clone(), *kind);
                new.credit_limit = *credit_limit;
                new.due_date = due_date.clone();
                let method = self.ledger.create_payment_method(new).await?;
                info!(payment_method = %method.name, kind = %method.kind, "payment method created");
                Ok(Reply::text(format!(
                    "✅ {} payment method *{}* created.",
                    capitalize(&method.kind.to_string()),
                    method.name
                ))
                .with_menu())
            }
            PendingAction::AddExpenseFromReceipt(_) | PendingAction::AddExpenseFromVoice(_) => {
                Err(TallyError::Internal(
                    "media drafts need a category and payment method first".to_string(),
                ))
            }
        }
    }

    /// Record an expense, creating its category and payment method if they
    /// don't exist yet, so both balances move with it.
    pub async fn add_expense(&self, expense: NewExpense) -> Result<Reply, TallyError> {
        self.ensure_category(&expense.category).await?;
        self.ensure_payment_method(&expense.payment_method).await?;
        let created = self.ledger.create_expense(expense).await?;
        info!(
            expense_id = created.id,
            category = %created.category,
            payment_method = %created.payment_method,
            "expense recorded"
        );

        let symbol = self.symbol();
        let mut text = format!(
            "✅ Added *{}* to *{}*",
            money(symbol, created.amount),
            created.category
        );
        if let Some(description) = &created.description {
            text.push_str(&format!(" for _{description}_"));
        }
        if let Some(category) = self.ledger.find_category(&created.category).await? {
            text.push_str(&format!(
                "\n{} balance: {}",
                category.name,
                money(symbol, category.balance)
            ));
        }
        if let Some(method) = self.ledger.find_payment_method(&created.payment_method).await? {
            text.push_str(&format!(
                "\n{}: {}",
                method.name,
                balance_label(symbol, &method)
            ));
        }
        Ok(Reply::text(text).with_menu())
    }

    /// Find a category by name, creating it when missing.
    pub async fn ensure_category(&self, name: &str) -> Result<Category, TallyError> {
        if let Some(category) = self.ledger.find_category(name).await? {
            return Ok(category);
        }
        let category = self
            .ledger
            .create_category(NewCategory::named(name.trim()))
            .await?;
        info!(category = %category.name, "category auto-created");
        Ok(category)
    }

    /// Find a payment method by name, creating it as cash when missing.
    pub async fn ensure_payment_method(&self, name: &str) -> Result<PaymentMethod, TallyError> {
        if let Some(method) = self.ledger.find_payment_method(name).await? {
            return Ok(method);
        }
        let method = self
            .ledger
            .create_payment_method(NewPaymentMethod::new(name.trim(), PaymentKind::Cash))
            .await?;
        info!(payment_method = %method.name, "payment method auto-created");
        Ok(method)
    }

    /// Categories to pick from in an expense flow; never empty.
    pub async fn expense_categories(&self) -> Result<Vec<Category>, TallyError> {
        let categories = self.ledger.list_categories().await?;
        if !categories.is_empty() {
            return Ok(categories);
        }
        Ok(vec![
            self.ensure_category(&self.settings.default_category)
                .await?,
        ])
    }

    /// Payment methods to pick from in an expense flow; never empty.
    pub async fn expense_payment_methods(
        &self,
        default_payment_method: &str,
    ) -> Result<Vec<PaymentMethod>, TallyError> {
        let methods = self.ledger.list_payment_methods().await?;
        if !methods.is_empty() {
            return Ok(methods);
        }
        Ok(vec![
            self.ensure_payment_method(default_payment_method)
                .await?,
        ])
    }

    pub async fn payment_methods_of_kind(
        &self,
        kind: PaymentKind,
    ) -> Result<Vec<PaymentMethod>, TallyError> {
        let mut methods = self.ledger.list_payment_methods().await?;
        methods.retain(|m| m.kind == kind);
        Ok(methods)
    }

    /// The cash method funds go to, created as "Cash" when none exists.
    pub async fn cash_method(&self) -> Result<PaymentMethod, TallyError> {
        if let Some(cash) = self
            .payment_methods_of_kind(PaymentKind::Cash)
            .await?
            .into_iter()
            .next()
        {
            return Ok(cash);
        }
        let cash = self
            .ledger
            .create_payment_method(NewPaymentMethod::new("Cash", PaymentKind::Cash))
            .await?;
        info!("cash payment method auto-created");
        Ok(cash)
    }

    pub async fn fund_category(&self, category_id: i64, amount: f64) -> Result<Reply, TallyError> {
        let funding = self
            .ledger
            .add_category_funds(category_id, amount, Some("Added via chat".to_string()))
            .await?;
        info!(category = %funding.category.name, amount, "category funded");
        let symbol = self.symbol();
        Ok(Reply::text(format!(
            "✅ Added {} to *{}*.\nBalance: {}",
            money(symbol, amount),
            funding.category.name,
            money(symbol, funding.category.balance)
        ))
        .with_menu())
    }

    pub async fn fund_payment_method(
        &self,
        payment_method_id: i64,
        amount: f64,
    ) -> Result<Reply, TallyError> {
        let funding = self
            .ledger
            .add_payment_method_funds(payment_method_id, amount, Some("Added via chat".to_string()))
            .await?;
        info!(payment_method = %funding.payment_method.name, amount, "payment method funded");
        let symbol = self.symbol();
        Ok(Reply::text(format!(
            "✅ Added {} to *{}*.\nBalance: {}",
            money(symbol, amount),
            funding.payment_method.name,
            money(symbol, funding.payment_method.balance)
        ))
        .with_menu())
    }

    /// Pay down a credit card: a negative delta on its outstanding balance.
    pub async fn pay_credit(&self, payment_method_id: i64, amount: f64) -> Result<Reply, TallyError> {
        let funding = self
            .ledger
            .add_payment_method_funds(
                payment_method_id,
                -amount,
                Some("Credit card payment".to_string()),
            )
            .await?;
        info!(payment_method = %funding.payment_method.name, amount, "credit card paid");
        let symbol = self.symbol();
        Ok(Reply::text(format!(
            "✅ Paid {} towards *{}*.\nStill owed: {}",
            money(symbol, amount),
            funding.payment_method.name,
            money(symbol, funding.payment_method.balance)
        ))
        .with_menu())
    }

    pub async fn reset_category(&self, category_id: i64) -> Result<Reply, TallyError> {
        let reset = self.ledger.reset_category(category_id).await?;
        info!(
            category = %reset.category.name,
            deleted_expenses = reset.deleted_expenses,
            deleted_fund_history = reset.deleted_fund_history,
            "category reset"
        );
        Ok(Reply::text(format!(
            "♻️ *{}* was reset. Removed {} expenses and {} fund entries.",
            reset.category.name, reset.deleted_expenses, reset.deleted_fund_history
        ))
        .with_menu())
    }

    /// Delete the most recently entered expense, whatever date it carries.
    pub async fn delete_last(&self) -> Result<Reply, TallyError> {
        let Some(last) = self
            .ledger
            .list_expenses(DateRange::all())
            .await?
            .into_iter()
            .max_by_key(|e| e.id)
        else {
            return Ok(Reply::text("There are no expenses to delete.").with_menu());
        };
        let deleted = self.ledger.delete_expense(last.id).await?;
        info!(expense_id = deleted.id, "expense deleted");
        Ok(Reply::text(format!(
            "🗑 Deleted: {}",
            format::expense_line(self.symbol(), &deleted)
        ))
        .with_menu())
    }

    // --- Read-only ---

    pub async fn recent_expenses(&self, period: &Period) -> Result<Reply, TallyError> {
        let expenses = self.ledger.list_expenses(period.range()).await?;
        Ok(Reply::text(format::recent_expenses(
            self.symbol(),
            &expenses,
            period,
            self.settings.recent_expenses_limit,
        ))
        .with_menu())
    }

    pub async fn summary(&self, period: &Period, with_budgets: bool) -> Result<Reply, TallyError> {
        let expenses = self.ledger.list_expenses(period.range()).await?;
        let summary = Summary::compute(&expenses, period);
        let text = if with_budgets {
            let categories = self.ledger.list_categories().await?;
            format::analytics(self.symbol(), &summary, period, &categories)
        } else {
            format::summary(self.symbol(), &summary, period)
        };
        Ok(Reply::text(text).with_menu())
    }

    pub async fn categories(&self) -> Result<Reply, TallyError> {
        let categories = self.ledger.list_categories().await?;
        Ok(Reply::text(format::categories(self.symbol(), &categories)).with_menu())
    }

    pub async fn payment_methods(&self) -> Result<Reply, TallyError> {
        let methods = self.ledger.list_payment_methods().await?;
        Ok(Reply::text(format::payment_methods(self.symbol(), &methods)).with_menu())
    }

    pub async fn export(&self, period: &Period) -> Result<Reply, TallyError> {
        let expenses = self.ledger.list_expenses(period.range()).await?;
        if expenses.is_empty() {
            return Ok(Reply::text(format!("No expenses {} to export.", period.label)).with_menu());
        }
        let bytes = report::export_csv(&expenses)?;
        Ok(
            Reply::text(format!("📤 Exported {} expenses {}.", expenses.len(), period.label))
                .with_menu()
                .with_document(Document {
                    filename: report::export_filename(period),
                    bytes,
                    caption: Some(format!("Expenses {}", period.label)),
                }),
        )
    }

    pub async fn backup(&self, today: NaiveDate) -> Result<Reply, TallyError> {
        let categories = self.ledger.list_categories().await?;
        let methods = self.ledger.list_payment_methods().await?;
        let expenses = self.ledger.list_expenses(DateRange::all()).await?;
        let bytes = report::backup_json(today, &categories, &methods, &expenses)?;
        Ok(Reply::text("💾 Here is a backup of all your data.")
            .with_menu()
            .with_document(Document {
                filename: format!("tally-backup-{today}.json"),
                bytes,
                caption: None,
            }))
    }
}

fn balance_label(symbol: &str, method: &PaymentMethod) -> String {
    match method.kind {
        PaymentKind::Credit => format!("{} owed", money(symbol, method.balance)),
        _ => format!("{} left", money(symbol, method.balance)),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("credit"), "Credit");
        assert_eq!(capitalize(""), "");
    }
}
