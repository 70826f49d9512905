//! MemoryHook - records interactions and learns preferences from them.
//!
//! Every successful dialogue transition is appended to the owner's interaction
//! log. When a conversation reaches `DONE` the confirmed bid card is recorded as
//! a `project_creation` interaction, which updates the owner's preferences.

use serde_json::json;
use std::sync::Arc;

use crate::domain::conversation::ConversationState;
use crate::domain::dialogue::{DialogueState, Transition};
use crate::domain::memory::{InteractionRecord, InteractionType, PreferenceRecord, PreferenceUpdate};
use crate::ports::{MemoryStore, MemoryStoreError};

/// Writes interaction history and preferences through the memory store.
#[derive(Clone)]
pub struct MemoryHook {
    store: Arc<dyn MemoryStore>,
}

impl MemoryHook {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Records one successful transition of `conversation` out of `from`.
    ///
    /// `conversation` is the record after the transition was applied.
    pub async fn record_transition(
        &self,
        conversation: &ConversationState,
        from: &DialogueState,
        transition: &Transition,
    ) -> Result<(), MemoryStoreError> {
        let record = InteractionRecord::new(
            conversation.owner_id.clone(),
            InteractionType::DialogueTransition,
            json!({
                "from": from.to_string(),
                "to": transition.next_state.to_string(),
                "applied": transition.applied,
            }),
        )
        .in_conversation(conversation.conversation_id.clone());
        self.record_interaction(&record).await?;

        if transition.next_state == DialogueState::Done {
            let record = InteractionRecord::new(
                conversation.owner_id.clone(),
                InteractionType::ProjectCreation,
                serde_json::to_value(&transition.slots)
                    .map_err(|e| MemoryStoreError::SerializationFailed(e.to_string()))?,
            )
            .in_conversation(conversation.conversation_id.clone());
            self.record_interaction(&record).await?;
        }

        Ok(())
    }

    /// Appends an interaction and folds its preference observations into the
    /// owner's preferences.
    ///
    /// # Returns
    /// The preference keys touched and what happened to each
    pub async fn record_interaction(
        &self,
        record: &InteractionRecord,
    ) -> Result<Vec<(String, PreferenceUpdate)>, MemoryStoreError> {
        self.store.append_interaction(record).await?;

        if !record.interaction_type.learns_preferences() {
            return Ok(Vec::new());
        }

        let mut updates = Vec::new();
        for (key, value) in record.preference_observations() {
            let update = match self.store.load_preference(&record.user_id, &key).await? {
                Some(mut existing) => {
                    let update = existing.observe(value, record.interaction_type);
                    if update != PreferenceUpdate::Ignored {
                        self.store.save_preference(&existing).await?;
                    }
                    update
                }
                None => {
                    let created = PreferenceRecord::first(
                        record.user_id.clone(),
                        key.clone(),
                        value,
                        record.interaction_type,
                    );
                    self.store.save_preference(&created).await?;
                    PreferenceUpdate::Created
                }
            };

            tracing::debug!(
                user_id = %record.user_id,
                preference = %key,
                update = ?update,
                "Preference observed"
            );
            updates.push((key, update));
        }

        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryMemoryStore;
    use crate::domain::foundation::UserId;
    use serde_json::json;

    fn user() -> UserId {
        UserId::new("homeowner-1").unwrap()
    }

    fn project(project_type: &str) -> InteractionRecord {
        InteractionRecord::new(
            user(),
            InteractionType::ProjectCreation,
            json!({ "project_type": project_type }),
        )
    }

    #[tokio::test]
    async fn preferences_strengthen_then_flip_while_weak() {
        let store = Arc::new(InMemoryMemoryStore::new());
        let hook = MemoryHook::new(store.clone());

        hook.record_interaction(&project("kitchen")).await.unwrap();
        let pref = store
            .load_preference(&user(), "preferred_project_types")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.confidence, 0.6);

        hook.record_interaction(&project("kitchen")).await.unwrap();
        let pref = store
            .load_preference(&user(), "preferred_project_types")
            .await
            .unwrap()
            .unwrap();
        assert_eq!((pref.count, pref.confidence), (2, 0.7));

        let updates = hook.record_interaction(&project("bathroom")).await.unwrap();
        assert_eq!(
            updates,
            vec![("preferred_project_types".to_string(), PreferenceUpdate::Replaced)]
        );
        let pref = store
            .load_preference(&user(), "preferred_project_types")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.value, json!("bathroom"));
        assert_eq!(pref.count, 1);
    }

    #[tokio::test]
    async fn established_preference_is_not_rewritten() {
        let store = Arc::new(InMemoryMemoryStore::new());
        let hook = MemoryHook::new(store.clone());
        for _ in 0..3 {
            hook.record_interaction(&project("roof")).await.unwrap();
        }

        let updates = hook.record_interaction(&project("deck")).await.unwrap();

        assert_eq!(updates[0].1, PreferenceUpdate::Ignored);
        let pref = store
            .load_preference(&user(), "preferred_project_types")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.value, json!("roof"));
        assert_eq!(pref.count, 3);
        assert_eq!(store.interaction_count(&user()).await, 4);
    }

    #[tokio::test]
    async fn dialogue_transitions_are_logged_without_preferences() {
        let store = Arc::new(InMemoryMemoryStore::new());
        let hook = MemoryHook::new(store.clone());
        let record = InteractionRecord::new(
            user(),
            InteractionType::DialogueTransition,
            json!({"from": "START", "to": "GATHER_LOCATION"}),
        );

        let updates = hook.record_interaction(&record).await.unwrap();

        assert!(updates.is_empty());
        assert!(store.preferences_for(&user()).await.unwrap().is_empty());
        assert_eq!(store.interaction_count(&user()).await, 1);
    }
}
