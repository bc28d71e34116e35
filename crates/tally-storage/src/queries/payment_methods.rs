// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment method CRUD operations.

use rusqlite::{Connection, Row, params};
use tally_core::{NewPaymentMethod, PaymentKind, PaymentMethod, TallyError};

use crate::database::{Database, map_tr_err};
use crate::queries::{conversion_error, optional};

pub(crate) const COLUMNS: &str = "id, name, kind, balance, credit_limit, due_date, created_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<PaymentMethod> {
    let kind: String = row.get(2)?;
    Ok(PaymentMethod {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind
            .parse::<PaymentKind>()
            .map_err(|e| conversion_error(2, e))?,
        balance: row.get(3)?,
        credit_limit: row.get(4)?,
        due_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn select_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<PaymentMethod>> {
    optional(conn.query_row(
        &format!("SELECT {COLUMNS} FROM payment_methods WHERE id = ?1"),
        params![id],
        from_row,
    ))
}

/// List all payment methods ordered by kind, then name.
pub async fn list_payment_methods(db: &Database) -> Result<Vec<PaymentMethod>, TallyError> {
    db.connection()
        .call(|conn| -> Result<Vec<PaymentMethod>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM payment_methods ORDER BY kind, name COLLATE NOCASE"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_payment_method(
    db: &Database,
    id: i64,
) -> Result<Option<PaymentMethod>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<PaymentMethod>, rusqlite::Error> {
            select_by_id(conn, id)
        })
        .await
        .map_err(map_tr_err)
}

/// Find a payment method by name, ignoring case and surrounding whitespace.
pub async fn find_payment_method(
    db: &Database,
    name: &str,
) -> Result<Option<PaymentMethod>, TallyError> {
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<PaymentMethod>, rusqlite::Error> {
            optional(conn.query_row(
                &format!("SELECT {COLUMNS} FROM payment_methods WHERE name = ?1 COLLATE NOCASE"),
                params![name],
                from_row,
            ))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn create_payment_method(
    db: &Database,
    method: NewPaymentMethod,
) -> Result<PaymentMethod, TallyError> {
    let name = method.name.trim().to_string();
    if name.is_empty() {
        return Err(TallyError::Validation(
            "payment method name must not be empty".into(),
        ));
    }
    db.connection()
        .call(move |conn| -> Result<PaymentMethod, rusqlite::Error> {
            conn.execute(
                "INSERT INTO payment_methods (name, kind, balance, credit_limit, due_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    name,
                    method.kind.to_string(),
                    method.balance,
                    method.credit_limit,
                    method.due_date,
                ],
            )?;
            let id = conn.last_insert_rowid();
            select_by_id(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_credit_card_keeps_limit_and_due_date() {
        let (db, _dir) = setup_db().await;
        let mut card = NewPaymentMethod::new("Visa", PaymentKind::Credit);
        card.credit_limit = Some(5000.0);
        card.due_date = Some("15".into());
        let created = create_payment_method(&db, card).await.unwrap();
        assert_eq!(created.kind, PaymentKind::Credit);
        assert_eq!(created.credit_limit, Some(5000.0));
        assert_eq!(created.balance, 0.0);

        let found = find_payment_method(&db, "VISA").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.due_date.as_deref(), Some("15"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_groups_by_kind() {
        let (db, _dir) = setup_db().await;
        create_payment_method(&db, NewPaymentMethod::new("Visa", PaymentKind::Credit))
            .await
            .unwrap();
        create_payment_method(&db, NewPaymentMethod::new("Cash", PaymentKind::Cash))
            .await
            .unwrap();
        create_payment_method(&db, NewPaymentMethod::new("Checking", PaymentKind::Debit))
            .await
            .unwrap();
        let kinds: Vec<_> = list_payment_methods(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(
            kinds,
            [PaymentKind::Cash, PaymentKind::Credit, PaymentKind::Debit]
        );
        db.close().await.unwrap();
    }
}
