//! Vision Analyzer Port - image/OCR analysis of attachments.

use async_trait::async_trait;

use crate::domain::extraction::{AttachmentDescriptor, VisionAnalysis};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisionError {
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("vision service unavailable: {0}")]
    Unavailable(String),
}

/// Port for the opaque vision call. Callers turn errors into an empty analysis.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, attachment: &AttachmentDescriptor) -> Result<VisionAnalysis, VisionError>;
}
