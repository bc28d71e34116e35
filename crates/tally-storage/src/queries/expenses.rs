// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expense operations with atomic balance bookkeeping.
//!
//! Recording an expense draws down the matching category balance. The
//! matching payment method is drawn down for cash and debit, while a credit
//! card's balance (outstanding debt) grows. Deleting reverses both.

use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use tally_core::{DateRange, Expense, NewExpense, TallyError};

use crate::database::{Database, map_tr_err};
use crate::queries::{conversion_error, optional};

const COLUMNS: &str = "id, amount, category, payment_method, description, date, created_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let date: String = row.get(5)?;
    Ok(Expense {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        payment_method: row.get(3)?,
        description: row.get(4)?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| conversion_error(5, e))?,
        created_at: row.get(6)?,
    })
}

fn select_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Expense>> {
    optional(conn.query_row(
        &format!("SELECT {COLUMNS} FROM expenses WHERE id = ?1"),
        params![id],
        from_row,
    ))
}

/// Apply an expense's effect on balances. `sign` is 1.0 to record, -1.0 to reverse.
fn apply_balances(
    conn: &Connection,
    category: &str,
    payment_method: &str,
    amount: f64,
    sign: f64,
) -> rusqlite::Result<()> {
    let delta = amount * sign;
    conn.execute(
        "UPDATE categories SET balance = balance - ?1 WHERE name = ?2 COLLATE NOCASE",
        params![delta, category.trim()],
    )?;
    conn.execute(
        "UPDATE payment_methods
         SET balance = CASE kind WHEN 'credit' THEN balance + ?1 ELSE balance - ?1 END
         WHERE name = ?2 COLLATE NOCASE",
        params![delta, payment_method.trim()],
    )?;
    Ok(())
}

/// Record an expense and update balances in one transaction.
pub async fn create_expense(db: &Database, expense: NewExpense) -> Result<Expense, TallyError> {
    if !(expense.amount.is_finite() && expense.amount > 0.0) {
        return Err(TallyError::Validation(format!(
            "expense amount must be positive, got {}",
            expense.amount
        )));
    }
    db.connection()
        .call(move |conn| -> Result<Expense, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO expenses (amount, category, payment_method, description, date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    expense.amount,
                    expense.category.trim(),
                    expense.payment_method.trim(),
                    expense.description,
                    expense.date.format(DATE_FORMAT).to_string(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            apply_balances(
                &tx,
                &expense.category,
                &expense.payment_method,
                expense.amount,
                1.0,
            )?;
            let created = select_by_id(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(created)
        })
        .await
        .map_err(map_tr_err)
}

/// List expenses within the range, newest first.
pub async fn list_expenses(db: &Database, range: DateRange) -> Result<Vec<Expense>, TallyError> {
    let start = range.start.map(|d| d.format(DATE_FORMAT).to_string());
    let end = range.end.map(|d| d.format(DATE_FORMAT).to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Expense>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM expenses
                 WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
                 ORDER BY date DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![start, end], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an expense and reverse its balance effects.
pub async fn delete_expense(db: &Database, id: i64) -> Result<Option<Expense>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<Expense>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(expense) = select_by_id(&tx, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
            apply_balances(
                &tx,
                &expense.category,
                &expense.payment_method,
                expense.amount,
                -1.0,
            )?;
            tx.commit()?;
            Ok(Some(expense))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{categories, payment_methods};
    use tally_core::{NewCategory, NewPaymentMethod, PaymentKind};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn expense(amount: f64, category: &str, method: &str, date: NaiveDate) -> NewExpense {
        NewExpense {
            amount,
            category: category.into(),
            payment_method: method.into(),
            description: None,
            date,
        }
    }

    #[tokio::test]
    async fn expense_updates_category_and_payment_balances() {
        let (db, _dir) = setup_db().await;
        categories::create_category(
            &db,
            NewCategory {
                name: "Food".into(),
                allocated_funds: Some(100.0),
                ..NewCategory::default()
            },
        )
        .await
        .unwrap();
        let mut cash = NewPaymentMethod::new("Cash", PaymentKind::Cash);
        cash.balance = 50.0;
        payment_methods::create_payment_method(&db, cash).await.unwrap();
        payment_methods::create_payment_method(&db, NewPaymentMethod::new("Visa", PaymentKind::Credit))
            .await
            .unwrap();

        create_expense(&db, expense(20.0, "food", "cash", day(1))).await.unwrap();
        create_expense(&db, expense(30.0, "Food", "visa", day(2))).await.unwrap();

        let food = categories::find_category(&db, "Food").await.unwrap().unwrap();
        assert_eq!(food.balance, 50.0);
        let cash = payment_methods::find_payment_method(&db, "Cash").await.unwrap().unwrap();
        assert_eq!(cash.balance, 30.0);
        let visa = payment_methods::find_payment_method(&db, "Visa").await.unwrap().unwrap();
        assert_eq!(visa.balance, 30.0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_names_still_record_the_expense() {
        let (db, _dir) = setup_db().await;
        let created = create_expense(&db, expense(9.5, "Nowhere", "Telegram", day(3)))
            .await
            .unwrap();
        assert_eq!(created.amount, 9.5);
        assert_eq!(created.date, day(3));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let (db, _dir) = setup_db().await;
        let err = create_expense(&db, expense(0.0, "Food", "Cash", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_range_newest_first() {
        let (db, _dir) = setup_db().await;
        for d in [1, 5, 10, 15] {
            create_expense(&db, expense(d as f64, "Food", "Cash", day(d))).await.unwrap();
        }
        let all = list_expenses(&db, DateRange::all()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].date, day(15));

        let mid = list_expenses(&db, DateRange::between(day(5), day(10))).await.unwrap();
        let dates: Vec<_> = mid.iter().map(|e| e.date).collect();
        assert_eq!(dates, [day(10), day(5)]);

        let open_start = list_expenses(
            &db,
            DateRange {
                start: None,
                end: Some(day(4)),
            },
        )
        .await
        .unwrap();
        assert_eq!(open_start.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_reverses_balances() {
        let (db, _dir) = setup_db().await;
        categories::create_category(&db, NewCategory::named("Fun")).await.unwrap();
        payment_methods::create_payment_method(&db, NewPaymentMethod::new("Visa", PaymentKind::Credit))
            .await
            .unwrap();
        let created = create_expense(&db, expense(40.0, "Fun", "Visa", day(1))).await.unwrap();

        let deleted = delete_expense(&db, created.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, created.id);
        let fun = categories::find_category(&db, "Fun").await.unwrap().unwrap();
        assert_eq!(fun.balance, 0.0);
        let visa = payment_methods::find_payment_method(&db, "Visa").await.unwrap().unwrap();
        assert_eq!(visa.balance, 0.0);

        assert!(delete_expense(&db, created.id).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
