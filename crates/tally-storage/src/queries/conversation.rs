// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat conversation state rows.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tally_core::{ConversationRecord, TallyError};

use crate::database::{Database, map_tr_err};
use crate::queries::{conversion_error, optional};

/// Get the state row for a chat.
pub async fn get_user_state(
    db: &Database,
    chat_id: &str,
) -> Result<Option<ConversationRecord>, TallyError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationRecord>, rusqlite::Error> {
            optional(conn.query_row(
                "SELECT chat_id, state, data, updated_at FROM conversation_state WHERE chat_id = ?1",
                params![chat_id],
                |row| {
                    let data: Option<String> = row.get(2)?;
                    let updated_at: String = row.get(3)?;
                    Ok(ConversationRecord {
                        chat_id: row.get(0)?,
                        state: row.get(1)?,
                        data: data
                            .map(|raw| serde_json::from_str(&raw))
                            .transpose()
                            .map_err(|e| conversion_error(2, e))?,
                        updated_at: DateTime::parse_from_rfc3339(&updated_at)
                            .map(|t| t.with_timezone(&Utc))
                            .map_err(|e| conversion_error(3, e))?,
                    })
                },
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert a chat's state, fully replacing any previous data.
pub async fn set_user_state(
    db: &Database,
    chat_id: &str,
    state: &str,
    data: Option<serde_json::Value>,
) -> Result<(), TallyError> {
    let chat_id = chat_id.to_string();
    let state = state.to_string();
    let data = data.map(|v| v.to_string());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversation_state (chat_id, state, data, updated_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(chat_id) DO UPDATE SET
                     state = excluded.state,
                     data = excluded.data,
                     updated_at = excluded.updated_at",
                params![chat_id, state, data],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a chat's state. Idempotent.
pub async fn clear_user_state(db: &Database, chat_id: &str) -> Result<(), TallyError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM conversation_state WHERE chat_id = ?1",
                params![chat_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn set_replaces_data_entirely() {
        let (db, _dir) = setup_db().await;
        set_user_state(
            &db,
            "telegram:1",
            "add_expense_select_payment",
            Some(json!({"categoryId": 1, "categoryName": "Food"})),
        )
        .await
        .unwrap();
        set_user_state(&db, "telegram:1", "add_expense_amount", Some(json!({"amount": 3})))
            .await
            .unwrap();

        let record = get_user_state(&db, "telegram:1").await.unwrap().unwrap();
        assert_eq!(record.state, "add_expense_amount");
        assert_eq!(record.data, Some(json!({"amount": 3})));
        assert!(record.updated_at <= Utc::now());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn state_without_data_round_trips_as_none() {
        let (db, _dir) = setup_db().await;
        set_user_state(&db, "whatsapp:555", "select_category_for_fund", None)
            .await
            .unwrap();
        let record = get_user_state(&db, "whatsapp:555").await.unwrap().unwrap();
        assert_eq!(record.data, None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (db, _dir) = setup_db().await;
        set_user_state(&db, "c", "awaiting_confirmation", Some(json!({})))
            .await
            .unwrap();
        clear_user_state(&db, "c").await.unwrap();
        clear_user_state(&db, "c").await.unwrap();
        assert!(get_user_state(&db, "c").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
