//! In-Memory Memory Store Adapter

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::domain::memory::{InteractionRecord, PreferenceRecord};
use crate::ports::{MemoryStore, MemoryStoreError};

#[derive(Debug, Default)]
struct UserMemory {
    interactions: Vec<InteractionRecord>,
    preferences: BTreeMap<String, PreferenceRecord>,
}

/// In-memory storage for interaction history and preferences
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemoryStore {
    users: Arc<RwLock<HashMap<UserId, UserMemory>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total interactions recorded for a user.
    pub async fn interaction_count(&self, user_id: &UserId) -> usize {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|m| m.interactions.len())
            .unwrap_or(0)
    }

    /// Clear all stored memory (for testing)
    pub async fn clear(&self) {
        self.users.write().await.clear();
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), MemoryStoreError> {
        self.users
            .write()
            .await
            .entry(record.user_id.clone())
            .or_default()
            .interactions
            .push(record.clone());
        Ok(())
    }

    async fn recent_interactions(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, MemoryStoreError> {
        let users = self.users.read().await;
        let Some(memory) = users.get(user_id) else {
            return Ok(Vec::new());
        };
        let skip = memory.interactions.len().saturating_sub(limit);
        Ok(memory.interactions[skip..].to_vec())
    }

    async fn load_preference(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<PreferenceRecord>, MemoryStoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .and_then(|m| m.preferences.get(key).cloned()))
    }

    async fn save_preference(&self, record: &PreferenceRecord) -> Result<(), MemoryStoreError> {
        self.users
            .write()
            .await
            .entry(record.user_id.clone())
            .or_default()
            .preferences
            .insert(record.preference_key.clone(), record.clone());
        Ok(())
    }

    async fn preferences_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PreferenceRecord>, MemoryStoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|m| m.preferences.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::InteractionType;
    use serde_json::json;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn recent_interactions_returns_newest_last() {
        let store = InMemoryMemoryStore::new();
        for i in 0..5 {
            let record = InteractionRecord::new(
                user("u1"),
                InteractionType::DialogueTransition,
                json!({ "turn": i }),
            );
            store.append_interaction(&record).await.unwrap();
        }

        let recent = store.recent_interactions(&user("u1"), 2).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].payload, json!({"turn": 3}));
        assert_eq!(recent[1].payload, json!({"turn": 4}));
        assert!(store.recent_interactions(&user("u2"), 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_preference_replaces_same_key() {
        let store = InMemoryMemoryStore::new();
        let mut pref = PreferenceRecord::first(
            user("u1"),
            "timeline_preference",
            json!("asap"),
            InteractionType::ProjectCreation,
        );
        store.save_preference(&pref).await.unwrap();
        pref.observe(json!("asap"), InteractionType::ProjectCreation);
        store.save_preference(&pref).await.unwrap();

        let all = store.preferences_for(&user("u1")).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].count, 2);
    }
}
