// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category CRUD operations.

use rusqlite::{Connection, Row, params};
use tally_core::{Category, NewCategory, TallyError};

use crate::database::{Database, map_tr_err};
use crate::queries::optional;

pub(crate) const COLUMNS: &str =
    "id, name, color, icon, budget_amount, allocated_funds, balance, created_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        icon: row.get(3)?,
        budget_amount: row.get(4)?,
        allocated_funds: row.get(5)?,
        balance: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn select_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Category>> {
    optional(conn.query_row(
        &format!("SELECT {COLUMNS} FROM categories WHERE id = ?1"),
        params![id],
        from_row,
    ))
}

/// List all categories ordered by name.
pub async fn list_categories(db: &Database) -> Result<Vec<Category>, TallyError> {
    db.connection()
        .call(|conn| -> Result<Vec<Category>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM categories ORDER BY name COLLATE NOCASE"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a category by id.
pub async fn get_category(db: &Database, id: i64) -> Result<Option<Category>, TallyError> {
    db.connection()
        .call(move |conn| -> Result<Option<Category>, rusqlite::Error> { select_by_id(conn, id) })
        .await
        .map_err(map_tr_err)
}

/// Find a category by name, ignoring case and surrounding whitespace.
pub async fn find_category(db: &Database, name: &str) -> Result<Option<Category>, TallyError> {
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Category>, rusqlite::Error> {
            optional(conn.query_row(
                &format!("SELECT {COLUMNS} FROM categories WHERE name = ?1 COLLATE NOCASE"),
                params![name],
                from_row,
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Create a category. Initial allocated funds also seed the balance.
pub async fn create_category(db: &Database, category: NewCategory) -> Result<Category, TallyError> {
    let name = category.name.trim().to_string();
    if name.is_empty() {
        return Err(TallyError::Validation("category name must not be empty".into()));
    }
    db.connection()
        .call(move |conn| -> Result<Category, rusqlite::Error> {
            let allocated = category.allocated_funds.unwrap_or(0.0);
            conn.execute(
                "INSERT INTO categories (name, color, icon, budget_amount, allocated_funds, balance)
                 VALUES (?1, COALESCE(?2, '#6b7280'), COALESCE(?3, '📁'), ?4, ?5, ?5)",
                params![
                    name,
                    category.color,
                    category.icon,
                    category.budget_amount.unwrap_or(0.0),
                    allocated,
                ],
            )?;
            let id = conn.last_insert_rowid();
            select_by_id(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}
