// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`LedgerStore`] wrapper that records mutations and can inject failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tally_core::{
    Category, CategoryFunding, CategoryReset, DateRange, Expense, LedgerStore, NewCategory,
    NewExpense, NewPaymentMethod, PaymentFunding, PaymentMethod, TallyError,
};

/// Delegates to an inner ledger, logging the name of every mutating call.
///
/// With [`fail_mutations`](Self::fail_mutations) set, mutations return a
/// storage error without reaching the inner ledger. Reads always pass.
pub struct RecordingLedger {
    inner: Arc<dyn LedgerStore>,
    mutations: Mutex<Vec<&'static str>>,
    failing: AtomicBool,
}

impl RecordingLedger {
    pub fn new(inner: Arc<dyn LedgerStore>) -> Self {
        Self {
            inner,
            mutations: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Names of the mutating calls made so far, in order.
    pub async fn mutations(&self) -> Vec<&'static str> {
        self.mutations.lock().await.clone()
    }

    pub async fn clear_mutations(&self) {
        self.mutations.lock().await.clear();
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    async fn record(&self, name: &'static str) -> Result<(), TallyError> {
        self.mutations.lock().await.push(name);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TallyError::storage(format!("injected failure in {name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RecordingLedger {
    async fn list_categories(&self) -> Result<Vec<Category>, TallyError> {
        self.inner.list_categories().await
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, TallyError> {
        self.inner.get_category(id).await
    }

    async fn find_category(&self, name: &str) -> Result<Option<Category>, TallyError> {
        self.inner.find_category(name).await
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, TallyError> {
        self.record("create_category").await?;
        self.inner.create_category(category).await
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, TallyError> {
        self.inner.list_payment_methods().await
    }

    async fn get_payment_method(&self, id: i64) -> Result<Option<PaymentMethod>, TallyError> {
        self.inner.get_payment_method(id).await
    }

    async fn find_payment_method(&self, name: &str) -> Result<Option<PaymentMethod>, TallyError> {
        self.inner.find_payment_method(name).await
    }

    async fn create_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, TallyError> {
        self.record("create_payment_method").await?;
        self.inner.create_payment_method(method).await
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, TallyError> {
        self.record("create_expense").await?;
        self.inner.create_expense(expense).await
    }

    async fn list_expenses(&self, range: DateRange) -> Result<Vec<Expense>, TallyError> {
        self.inner.list_expenses(range).await
    }

    async fn delete_expense(&self, id: i64) -> Result<Expense, TallyError> {
        self.record("delete_expense").await?;
        self.inner.delete_expense(id).await
    }

    async fn add_category_funds(
        &self,
        category_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<CategoryFunding, TallyError> {
        self.record("add_category_funds").await?;
        self.inner
            .add_category_funds(category_id, amount, description)
            .await
    }

    async fn add_payment_method_funds(
        &self,
        payment_method_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<PaymentFunding, TallyError> {
        self.record("add_payment_method_funds").await?;
        self.inner
            .add_payment_method_funds(payment_method_id, amount, description)
            .await
    }

    async fn reset_category(&self, category_id: i64) -> Result<CategoryReset, TallyError> {
        self.record("reset_category").await?;
        self.inner.reset_category(category_id).await
    }
}
