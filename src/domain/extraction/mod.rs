//! Extraction module - turns message text and attachments into slot evidence.

mod builtin;
mod extractor;
mod input;
mod pipeline;
mod result;

pub use builtin::{
    default_extractors, PlaceNameExtractor, ProjectKeywordExtractor, VisionCategoryExtractor,
    VisionFieldExtractor, YesNoExtractor, ZipCodeExtractor,
};
pub use extractor::{ExtractionContext, Extractor, ExtractorError, ExtractorSet};
pub use input::{AttachmentDescriptor, ExtractionInput, VisionAnalysis};
pub use pipeline::ExtractionPipeline;
pub use result::ExtractionResult;
