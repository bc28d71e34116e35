// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat serialization of event handling.

use std::sync::Arc;

use dashmap::DashMap;
use tally_core::StateKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per chat, so a double-tapped button or a message racing
/// a slow extraction sees the state its predecessor wrote. Different chats
/// never contend. An entry lives only while someone holds or waits on it.
#[derive(Default)]
pub struct ChatLocks {
    locks: Arc<DashMap<StateKey, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a chat.
    pub async fn acquire(&self, key: &StateKey) -> ChatGuard {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ChatGuard {
            guard: Some(lock.lock_owned().await),
            key: key.clone(),
            locks: self.locks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one chat. Dropping it unlocks the chat and forgets
/// the lock when no other event is waiting for it.
pub struct ChatGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: StateKey,
    locks: Arc<DashMap<StateKey, Arc<Mutex<()>>>>,
}

impl Drop for ChatGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone, so only the map's own reference may remain.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tally_core::ChatId;

    #[tokio::test]
    async fn same_chat_is_serialized() {
        let locks = Arc::new(ChatLocks::new());
        let key = StateKey::new("telegram", &ChatId::new("1"));

        let guard = locks.acquire(&key).await;
        let contender = {
            let locks = locks.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_chats_do_not_contend() {
        let locks = ChatLocks::new();
        let _a = locks
            .acquire(&StateKey::new("telegram", &ChatId::new("1")))
            .await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&StateKey::new("whatsapp", &ChatId::new("1"))),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_chats_are_forgotten() {
        let locks = ChatLocks::new();
        for n in 0..5 {
            let _guard = locks
                .acquire(&StateKey::new("telegram", &ChatId::new(n.to_string())))
                .await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn lock_outlives_release_while_someone_waits() {
        let locks = Arc::new(ChatLocks::new());
        let key = StateKey::new("telegram", &ChatId::new("1"));

        let first = locks.acquire(&key).await;
        let waiter = {
            let locks = locks.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&key).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
