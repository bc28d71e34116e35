// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ledger and conversation state stores.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tally_config::model::StorageConfig;
use tally_core::{
    AdapterType, Category, CategoryFunding, CategoryReset, ConversationRecord, ConversationStore,
    DateRange, Expense, HealthStatus, LedgerStore, NewCategory, NewExpense, NewPaymentMethod,
    PaymentFunding, PaymentMethod, PluginAdapter, TallyError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store. The database is not opened until [`initialize`](Self::initialize).
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), TallyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TallyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, TallyError> {
        self.db.get().ok_or_else(|| TallyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn list_categories(&self) -> Result<Vec<Category>, TallyError> {
        queries::categories::list_categories(self.db()?).await
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, TallyError> {
        queries::categories::get_category(self.db()?, id).await
    }

    async fn find_category(&self, name: &str) -> Result<Option<Category>, TallyError> {
        queries::categories::find_category(self.db()?, name).await
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, TallyError> {
        queries::categories::create_category(self.db()?, category).await
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, TallyError> {
        queries::payment_methods::list_payment_methods(self.db()?).await
    }

    async fn get_payment_method(&self, id: i64) -> Result<Option<PaymentMethod>, TallyError> {
        queries::payment_methods::get_payment_method(self.db()?, id).await
    }

    async fn find_payment_method(&self, name: &str) -> Result<Option<PaymentMethod>, TallyError> {
        queries::payment_methods::find_payment_method(self.db()?, name).await
    }

    async fn create_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, TallyError> {
        queries::payment_methods::create_payment_method(self.db()?, method).await
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, TallyError> {
        queries::expenses::create_expense(self.db()?, expense).await
    }

    async fn list_expenses(&self, range: DateRange) -> Result<Vec<Expense>, TallyError> {
        queries::expenses::list_expenses(self.db()?, range).await
    }

    async fn delete_expense(&self, id: i64) -> Result<Expense, TallyError> {
        queries::expenses::delete_expense(self.db()?, id)
            .await?
            .ok_or_else(|| TallyError::not_found("expense", id))
    }

    async fn add_category_funds(
        &self,
        category_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<CategoryFunding, TallyError> {
        queries::funds::add_category_funds(self.db()?, category_id, amount, description)
            .await?
            .ok_or_else(|| TallyError::not_found("category", category_id))
    }

    async fn add_payment_method_funds(
        &self,
        payment_method_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<PaymentFunding, TallyError> {
        queries::funds::add_payment_method_funds(
            self.db()?,
            payment_method_id,
            amount,
            description,
        )
        .await?
        .ok_or_else(|| TallyError::not_found("payment method", payment_method_id))
    }

    async fn reset_category(&self, category_id: i64) -> Result<CategoryReset, TallyError> {
        queries::funds::reset_category(self.db()?, category_id)
            .await?
            .ok_or_else(|| TallyError::not_found("category", category_id))
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn get_user_state(
        &self,
        chat_id: &str,
    ) -> Result<Option<ConversationRecord>, TallyError> {
        queries::conversation::get_user_state(self.db()?, chat_id).await
    }

    async fn set_user_state(
        &self,
        chat_id: &str,
        state: &str,
        data: Option<serde_json::Value>,
    ) -> Result<(), TallyError> {
        queries::conversation::set_user_state(self.db()?, chat_id, state, data).await
    }

    async fn clear_user_state(&self, chat_id: &str) -> Result<(), TallyError> {
        queries::conversation::clear_user_state(self.db()?, chat_id).await
    }
}
