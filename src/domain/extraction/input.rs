//! Extraction inputs: message text and analyzed attachments.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::AttachmentId;

/// An uploaded attachment as handed in by the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub id: AttachmentId,
    pub media_type: String,
    /// Opaque metadata (storage url, dimensions, ...).
    #[serde(default)]
    pub metadata: Value,
}

impl AttachmentDescriptor {
    pub fn new(id: AttachmentId, media_type: impl Into<String>) -> Self {
        Self {
            id,
            media_type: media_type.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Result of the vision/OCR call for one attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_assessment: Option<String>,
}

impl VisionAnalysis {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.objects.is_empty()
            && self.text.is_empty()
            && self.damage_assessment.is_none()
    }

    /// Looks up a named field for `extraction_field` mappings.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "labels" => Some(json!(self.labels)),
            "objects" => Some(json!(self.objects)),
            "text" => Some(json!(self.text.join(" "))),
            "damage_assessment" => self.damage_assessment.clone().map(Value::String),
            _ => None,
        }
    }
}

/// One unit of evidence for the extractors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionInput {
    Text(String),
    Attachment {
        descriptor: AttachmentDescriptor,
        analysis: VisionAnalysis,
    },
}

impl ExtractionInput {
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionInput::Text(text) => Some(text),
            ExtractionInput::Attachment { .. } => None,
        }
    }

    pub fn analysis(&self) -> Option<&VisionAnalysis> {
        match self {
            ExtractionInput::Attachment { analysis, .. } => Some(analysis),
            ExtractionInput::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_maps_known_names() {
        let analysis = VisionAnalysis {
            labels: vec!["roof".into()],
            objects: vec![],
            text: vec!["ACME".into(), "Roofing".into()],
            damage_assessment: Some("missing shingles".into()),
        };
        assert_eq!(analysis.field("labels"), Some(json!(["roof"])));
        assert_eq!(analysis.field("text"), Some(json!("ACME Roofing")));
        assert_eq!(analysis.field("damage_assessment"), Some(json!("missing shingles")));
        assert_eq!(analysis.field("colour"), None);
    }

    #[test]
    fn missing_fields_deserialize_to_empty() {
        let analysis: VisionAnalysis = serde_json::from_str("{}").unwrap();
        assert!(analysis.is_empty());
    }

    #[test]
    fn image_media_types_are_detected() {
        let desc = AttachmentDescriptor::new(AttachmentId::new("a").unwrap(), "image/png");
        assert!(desc.is_image());
        let pdf = AttachmentDescriptor::new(AttachmentId::new("b").unwrap(), "application/pdf");
        assert!(!pdf.is_image());
    }
}
