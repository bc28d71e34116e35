// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ConversationStore`] for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use tally_core::{ConversationRecord, ConversationStore, TallyError};

/// Conversation states kept in a map. `backdate` ages a record so expiry
/// can be exercised without sleeping.
#[derive(Default)]
pub struct MemoryStates {
    records: Mutex<HashMap<String, ConversationRecord>>,
}

impl MemoryStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a record's `updated_at` into the past.
    pub async fn backdate(&self, chat_id: &str, secs: i64) {
        if let Some(record) = self.records.lock().await.get_mut(chat_id) {
            record.updated_at -= TimeDelta::seconds(secs);
        }
    }

    /// Store a raw record, bypassing the typed flow encoding.
    pub async fn insert_raw(&self, chat_id: &str, state: &str, data: Option<serde_json::Value>) {
        self.records.lock().await.insert(
            chat_id.to_string(),
            ConversationRecord {
                chat_id: chat_id.to_string(),
                state: state.to_string(),
                data,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryStates {
    async fn get_user_state(
        &self,
        chat_id: &str,
    ) -> Result<Option<ConversationRecord>, TallyError> {
        Ok(self.records.lock().await.get(chat_id).cloned())
    }

    async fn set_user_state(
        &self,
        chat_id: &str,
        state: &str,
        data: Option<serde_json::Value>,
    ) -> Result<(), TallyError> {
        self.insert_raw(chat_id, state, data).await;
        Ok(())
    }

    async fn clear_user_state(&self, chat_id: &str) -> Result<(), TallyError> {
        self.records.lock().await.remove(chat_id);
        Ok(())
    }
}
