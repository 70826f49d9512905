//! Extractor trait and the named set the pipeline runs.

use std::sync::Arc;

use crate::domain::slots::SlotRegistry;

use super::input::ExtractionInput;
use super::result::ExtractionResult;

/// Failure inside a single extractor. Absorbed by the pipeline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Extractor '{extractor}' failed: {message}")]
pub struct ExtractorError {
    pub extractor: String,
    pub message: String,
}

impl ExtractorError {
    pub fn new(extractor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            extractor: extractor.into(),
            message: message.into(),
        }
    }
}

/// What an extractor may know about the conversation besides the input.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub registry: &'a SlotRegistry,
    /// Slot the dialogue is currently gathering, if any.
    pub gathering: Option<&'a str>,
}

/// A pure function deriving slot values from one input.
pub trait Extractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn extract(
        &self,
        input: &ExtractionInput,
        ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError>;
}

/// Ordered collection of extractors. Later extractors win on conflicting slots.
#[derive(Clone, Default)]
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    pub fn push(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extractor>> {
        self.extractors.iter()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl std::fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.extractors.iter().map(|e| e.name()))
            .finish()
    }
}
