//! Memory Store Port - interaction history and learned preferences per user.

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::domain::memory::{InteractionRecord, PreferenceRecord};

/// Errors that can occur during memory store operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("Failed to serialize memory: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize memory: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for the user memory that outlives conversations.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Appends an interaction. Durable when this returns `Ok`.
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), MemoryStoreError>;

    /// Most recent interactions for a user, newest last.
    async fn recent_interactions(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, MemoryStoreError>;

    async fn load_preference(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<PreferenceRecord>, MemoryStoreError>;

    /// Inserts or replaces the preference with the same user and key.
    async fn save_preference(&self, record: &PreferenceRecord) -> Result<(), MemoryStoreError>;

    /// All preferences of a user, ordered by key.
    async fn preferences_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PreferenceRecord>, MemoryStoreError>;
}
