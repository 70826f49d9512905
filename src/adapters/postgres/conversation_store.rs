//! PostgreSQL implementation of ConversationStore.
//!
//! Each conversation is one row holding the full record as a JSON document.
//! The scalar columns duplicate fields of the document for querying only; the
//! document is authoritative on load.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::ConversationId;
use crate::ports::{ConversationStore, StoreError};

/// PostgreSQL implementation of ConversationStore.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    /// Creates a new PostgresConversationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with at most `max_connections` pooled connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to connect: {}", e)))?;
        Ok(Self::new(pool))
    }

    /// Creates the conversations table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS intake_conversations (
                conversation_id TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL,
                current_state   TEXT NOT NULL,
                document        TEXT NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL,
                updated_at      TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT document
            FROM intake_conversations
            WHERE conversation_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(format!("Failed to fetch conversation: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row
            .try_get("document")
            .map_err(|e| StoreError::DatabaseError(format!("Failed to read document: {}", e)))?;

        let state = serde_json::from_str(&document)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(state))
    }

    async fn save(&self, id: &ConversationId, state: &ConversationState) -> Result<(), StoreError> {
        let document = serde_json::to_string(state)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO intake_conversations (
                conversation_id, owner_id, current_state, document, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (conversation_id) DO UPDATE SET
                current_state = EXCLUDED.current_state,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(id.as_str())
        .bind(state.owner_id.as_str())
        .bind(state.current_state.to_string())
        .bind(&document)
        .bind(state.created_at.as_datetime())
        .bind(state.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::DatabaseError(format!("Failed to upsert conversation: {}", e)))?;

        tx.commit().await.map_err(|e| {
            StoreError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }
}
