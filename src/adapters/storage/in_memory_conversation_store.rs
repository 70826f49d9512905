//! In-Memory Conversation Store Adapter
//!
//! Keeps conversation records in a map. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::ConversationId;
use crate::ports::{ConversationStore, StoreError};

/// In-memory storage for conversation records
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    states: Arc<RwLock<HashMap<ConversationId, ConversationState>>>,
    fail_saves: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_saves.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.states.read().await.get(id).cloned())
    }

    async fn save(&self, id: &ConversationId, state: &ConversationState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".into()));
        }
        self.states.write().await.insert(id.clone(), state.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::slots::{slot_set, SlotSet};

    fn state(id: &str) -> ConversationState {
        ConversationState::new(
            ConversationId::new(id).unwrap(),
            UserId::new("owner").unwrap(),
            slot_set(["location"]),
            SlotSet::new(),
        )
    }

    #[tokio::test]
    async fn load_unknown_returns_none() {
        let store = InMemoryConversationStore::new();
        let loaded = store.load(&ConversationId::new("nope").unwrap()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryConversationStore::new();
        let s = state("c1");
        store.save(&s.conversation_id, &s).await.unwrap();

        let loaded = store.load(&s.conversation_id).await.unwrap();
        assert_eq!(loaded, Some(s));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_rejects_saves() {
        let store = InMemoryConversationStore::new();
        store.set_unavailable(true);
        let s = state("c1");

        let result = store.save(&s.conversation_id, &s).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.is_empty().await);
    }
}
