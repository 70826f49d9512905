//! Conversation Store Port - keyed document store for conversation records.
//!
//! `load` returns `None` for unknown ids; `save` is a full-record overwrite.
//! Implementations must make a successful `save` durable before returning.

use async_trait::async_trait;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::ConversationId;

/// Errors that can occur during conversation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to serialize conversation: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize conversation: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Port for persisting conversation records.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Loads a conversation.
    ///
    /// # Returns
    /// `Ok(None)` if no record exists for the id
    ///
    /// # Errors
    /// Returns `StoreError` if the record exists but cannot be read
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError>;

    /// Saves a conversation, replacing any previous record.
    ///
    /// # Errors
    /// Returns `StoreError` if the write could not be confirmed
    async fn save(&self, id: &ConversationId, state: &ConversationState) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        let err = StoreError::SerializationFailed("bad yaml".to_string());
        assert!(err.to_string().contains("serialize"));

        let err = StoreError::DatabaseError("connection reset".to_string());
        assert_eq!(err.to_string(), "Database error: connection reset");
    }
}
