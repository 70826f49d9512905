//! File-based Memory Store Adapter
//!
//! Keeps one YAML document per user holding the interaction log and the
//! preference table. Every write rewrites the document through a temporary
//! file; writes are serialized within the process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::file_conversation_store::file_stem;
use crate::domain::foundation::UserId;
use crate::domain::memory::{InteractionRecord, PreferenceRecord};
use crate::ports::{MemoryStore, MemoryStoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMemoryDocument {
    #[serde(default)]
    interactions: Vec<InteractionRecord>,
    #[serde(default)]
    preferences: BTreeMap<String, PreferenceRecord>,
}

/// File-based storage for user memory
#[derive(Debug, Clone)]
pub struct FileMemoryStore {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileMemoryStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn user_file_path(&self, user_id: &UserId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", file_stem(user_id.as_str())))
    }

    async fn read_document(&self, user_id: &UserId) -> Result<UserMemoryDocument, MemoryStoreError> {
        let yaml = match fs::read_to_string(self.user_file_path(user_id)).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(UserMemoryDocument::default())
            }
            Err(e) => return Err(MemoryStoreError::IoError(e.to_string())),
        };
        serde_yaml::from_str(&yaml).map_err(|e| MemoryStoreError::DeserializationFailed(e.to_string()))
    }

    async fn write_document(
        &self,
        user_id: &UserId,
        document: &UserMemoryDocument,
    ) -> Result<(), MemoryStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| MemoryStoreError::IoError(e.to_string()))?;

        let yaml = serde_yaml::to_string(document)
            .map_err(|e| MemoryStoreError::SerializationFailed(e.to_string()))?;

        let file_path = self.user_file_path(user_id);
        let tmp_path = file_path.with_extension("yaml.tmp");

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| MemoryStoreError::IoError(e.to_string()))?;
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| MemoryStoreError::IoError(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| MemoryStoreError::IoError(e.to_string()))?;
        drop(file);

        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| MemoryStoreError::IoError(e.to_string()))
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), MemoryStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document(&record.user_id).await?;
        document.interactions.push(record.clone());
        self.write_document(&record.user_id, &document).await
    }

    async fn recent_interactions(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, MemoryStoreError> {
        let mut interactions = self.read_document(user_id).await?.interactions;
        let skip = interactions.len().saturating_sub(limit);
        Ok(interactions.split_off(skip))
    }

    async fn load_preference(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<PreferenceRecord>, MemoryStoreError> {
        Ok(self.read_document(user_id).await?.preferences.remove(key))
    }

    async fn save_preference(&self, record: &PreferenceRecord) -> Result<(), MemoryStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document(&record.user_id).await?;
        document
            .preferences
            .insert(record.preference_key.clone(), record.clone());
        self.write_document(&record.user_id, &document).await
    }

    async fn preferences_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PreferenceRecord>, MemoryStoreError> {
        Ok(self
            .read_document(user_id)
            .await?
            .preferences
            .into_values()
            .collect())
    }
}
