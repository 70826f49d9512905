//! Static Vision Analyzer - VisionAnalyzer without a vision service.
//!
//! Answers from canned analyses registered per attachment, then from an
//! `analysis` object embedded in the attachment metadata. Used by tests and by
//! deployments where uploads arrive already analyzed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::extraction::{AttachmentDescriptor, VisionAnalysis};
use crate::domain::foundation::AttachmentId;
use crate::ports::{VisionAnalyzer, VisionError};

#[derive(Debug, Clone, Default)]
pub struct StaticVisionAnalyzer {
    canned: Arc<RwLock<HashMap<AttachmentId, Result<VisionAnalysis, VisionError>>>>,
}

impl StaticVisionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the analysis returned for an attachment.
    pub async fn insert(&self, id: AttachmentId, analysis: VisionAnalysis) {
        self.canned.write().await.insert(id, Ok(analysis));
    }

    /// Makes analysis of an attachment fail.
    pub async fn fail(&self, id: AttachmentId, error: VisionError) {
        self.canned.write().await.insert(id, Err(error));
    }
}

#[async_trait]
impl VisionAnalyzer for StaticVisionAnalyzer {
    async fn analyze(&self, attachment: &AttachmentDescriptor) -> Result<VisionAnalysis, VisionError> {
        if let Some(canned) = self.canned.read().await.get(&attachment.id) {
            return canned.clone();
        }

        if !attachment.is_image() {
            return Err(VisionError::UnsupportedMedia(attachment.media_type.clone()));
        }

        match attachment.metadata.get("analysis") {
            Some(embedded) => serde_json::from_value(embedded.clone())
                .map_err(|e| VisionError::Unavailable(format!("bad embedded analysis: {}", e))),
            None => Ok(VisionAnalysis::default()),
        }
    }
}
