// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fund movements and category reset.

use rusqlite::{Connection, params};
use tally_core::{
    CategoryFunding, CategoryReset, FundHistory, FundTarget, PaymentFunding, TallyError,
};

use crate::database::{Database, map_tr_err};
use crate::queries::{categories, conversion_error, payment_methods};

fn insert_history(
    conn: &Connection,
    target: FundTarget,
    target_id: i64,
    amount: f64,
    description: Option<&str>,
) -> rusqlite::Result<FundHistory> {
    conn.execute(
        "INSERT INTO fund_history (target_kind, target_id, amount, description)
         VALUES (?1, ?2, ?3, ?4)",
        params![target.to_string(), target_id, amount, description],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT id, target_kind, target_id, amount, description, created_at
         FROM fund_history WHERE id = ?1",
        params![id],
        |row| {
            let kind: String = row.get(1)?;
            Ok(FundHistory {
                id: row.get(0)?,
                target: kind.parse().map_err(|e| conversion_error(1, e))?,
                target_id: row.get(2)?,
                amount: row.get(3)?,
                description: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
}

/// Add funds to a category: both allocated funds and balance grow.
///
/// Returns `None` when the category does not exist.
pub async fn add_category_funds(
    db: &Database,
    category_id: i64,
    amount: f64,
    description: Option<String>,
) -> Result<Option<CategoryFunding>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<CategoryFunding>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE categories
                 SET allocated_funds = allocated_funds + ?1, balance = balance + ?1
                 WHERE id = ?2",
                params![amount, category_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let history = insert_history(
                &tx,
                FundTarget::Category,
                category_id,
                amount,
                description.as_deref(),
            )?;
            let category =
                categories::select_by_id(&tx, category_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(CategoryFunding { history, category }))
        })
        .await
        .map_err(map_tr_err)
}

/// Add `amount` to a payment method balance. Negative amounts are payments.
///
/// Returns `None` when the payment method does not exist.
pub async fn add_payment_method_funds(
    db: &Database,
    payment_method_id: i64,
    amount: f64,
    description: Option<String>,
) -> Result<Option<PaymentFunding>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<PaymentFunding>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE payment_methods SET balance = balance + ?1 WHERE id = ?2",
                params![amount, payment_method_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let history = insert_history(
                &tx,
                FundTarget::PaymentMethod,
                payment_method_id,
                amount,
                description.as_deref(),
            )?;
            let payment_method = payment_methods::select_by_id(&tx, payment_method_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(PaymentFunding {
                history,
                payment_method,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a category's expenses and fund history and zero its balances.
///
/// Returns `None` when the category does not exist.
pub async fn reset_category(
    db: &Database,
    category_id: i64,
) -> Result<Option<CategoryReset>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<CategoryReset>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(category) = categories::select_by_id(&tx, category_id)? else {
                return Ok(None);
            };
            let deleted_expenses = tx.execute(
                "DELETE FROM expenses WHERE category = ?1 COLLATE NOCASE",
                params![category.name],
            )?;
            let deleted_fund_history = tx.execute(
                "DELETE FROM fund_history WHERE target_kind = 'category' AND target_id = ?1",
                params![category_id],
            )?;
            tx.execute(
                "UPDATE categories SET balance = 0, allocated_funds = 0 WHERE id = ?1",
                params![category_id],
            )?;
            let category =
                categories::select_by_id(&tx, category_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(CategoryReset {
                deleted_expenses,
                deleted_fund_history,
                category,
            }))
        })
        .await
        .map_err(map_tr_err)
}
