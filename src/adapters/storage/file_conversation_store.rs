//! File-based Conversation Store Adapter
//!
//! Stores each conversation as one YAML document on disk. Writes go to a
//! temporary file that is synced and then renamed over the previous record, so
//! a crash never leaves a half-written document behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::ConversationId;
use crate::ports::{ConversationStore, StoreError};

/// File-based storage for conversation records
#[derive(Debug, Clone)]
pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    /// Create a new file store with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let store = FileConversationStore::new("./data/conversations");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the YAML document for a conversation
    fn state_file_path(&self, id: &ConversationId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", file_stem(id.as_str())))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))
    }
}

/// Maps an arbitrary id to a safe file name. Characters outside `[A-Za-z0-9_-]`
/// are hex-escaped as `%XX`, so distinct ids never collide.
pub(super) fn file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationState>, StoreError> {
        let file_path = self.state_file_path(id);

        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::IoError(e.to_string())),
        };

        let state = serde_yaml::from_str(&yaml)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(state))
    }

    async fn save(&self, id: &ConversationId, state: &ConversationState) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let yaml = serde_yaml::to_string(state)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;

        let file_path = self.state_file_path(id);
        let tmp_path = file_path.with_extension("yaml.tmp");

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        drop(file);

        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;

        tracing::debug!(conversation_id = %id, path = %file_path.display(), "Saved conversation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{MultiModalEntry, Role};
    use crate::domain::dialogue::DialogueState;
    use crate::domain::foundation::{AttachmentId, Timestamp, UserId};
    use crate::domain::slots::slot_set;
    use serde_json::json;
    use tempfile::TempDir;

    fn reachable_state(id: &str) -> ConversationState {
        let mut state = ConversationState::new(
            ConversationId::new(id).unwrap(),
            UserId::new("owner-1").unwrap(),
            slot_set(["project_type", "location"]),
            slot_set(["group_bidding"]),
        );
        state.current_state = DialogueState::gather("location");
        state.slots.insert("project_type".into(), json!("bathroom"));
        state.slots.insert("group_bidding".into(), json!(false));
        state.append_message(Role::User, "bathroom remodel", Vec::new());
        state.append_message(Role::Assistant, "Where is it?", Vec::new());
        state.multi_modal_context.insert(
            AttachmentId::new("photo-1").unwrap(),
            MultiModalEntry {
                media_type: "image/jpeg".into(),
                data: json!({"analysis": {"labels": ["tile", "shower"]}}),
                timestamp: Timestamp::now(),
            },
        );
        state.last_error = Some("LLM output parsing failed.".into());
        state
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let state = reachable_state("conv-1");

        store.save(&state.conversation_id, &state).await.unwrap();
        let loaded = store.load(&state.conversation_id).await.unwrap();

        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path().join("not-created-yet"));
        let loaded = store.load(&ConversationId::new("ghost").unwrap()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_overwrites_previous_record() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let mut state = reachable_state("conv-1");
        store.save(&state.conversation_id, &state).await.unwrap();

        state.slots.insert("location".into(), json!("80202"));
        state.current_state = DialogueState::AwaitConfirmation;
        store.save(&state.conversation_id, &state).await.unwrap();

        let loaded = store.load(&state.conversation_id).await.unwrap().unwrap();
        assert_eq!(loaded.current_state, DialogueState::AwaitConfirmation);
        assert_eq!(loaded.slots.get("location"), Some(&json!("80202")));
    }

    #[tokio::test]
    async fn unusual_ids_map_to_distinct_files() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let a = reachable_state("thread/1");
        let b = reachable_state("thread_1");

        store.save(&a.conversation_id, &a).await.unwrap();
        store.save(&b.conversation_id, &b).await.unwrap();

        assert_eq!(store.load(&a.conversation_id).await.unwrap(), Some(a));
        assert_eq!(store.load(&b.conversation_id).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_deserialization_error() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let id = ConversationId::new("broken").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "current_state: [").unwrap();

        let result = store.load(&id).await;

        assert!(matches!(result, Err(StoreError::DeserializationFailed(_))));
    }

    #[test]
    fn file_stem_escapes_separators() {
        assert_eq!(file_stem("abc-1_2"), "abc-1_2");
        assert_eq!(file_stem("a/b"), "a%2Fb");
        assert_eq!(file_stem("../x"), "%2E%2E%2Fx");
    }
}
