//! Extraction Pipeline.
//!
//! Runs every extractor in the set against one input and merges their results.
//! Extractors are isolated from each other: an error or panic in one is logged and
//! contributes nothing, while its siblings still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::json;

use crate::domain::conversation::{MultiModalContext, MultiModalEntry};
use crate::domain::foundation::Timestamp;
use crate::domain::slots::SlotRegistry;

use super::extractor::{ExtractionContext, ExtractorSet};
use super::input::ExtractionInput;
use super::result::ExtractionResult;

/// Runs extractors against message text and analyzed attachments.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    registry: Arc<SlotRegistry>,
    extractors: ExtractorSet,
}

impl ExtractionPipeline {
    pub fn new(registry: Arc<SlotRegistry>, extractors: ExtractorSet) -> Self {
        Self {
            registry,
            extractors,
        }
    }

    /// Records an attachment input into `context`. Text inputs are ignored.
    pub fn record(input: &ExtractionInput, context: &mut MultiModalContext) {
        if let ExtractionInput::Attachment {
            descriptor,
            analysis,
        } = input
        {
            context.insert(
                descriptor.id.clone(),
                MultiModalEntry {
                    media_type: descriptor.media_type.clone(),
                    data: json!({
                        "metadata": descriptor.metadata,
                        "analysis": analysis,
                    }),
                    timestamp: Timestamp::now(),
                },
            );
        }
    }

    /// Extracts slot evidence from one input.
    ///
    /// Attachments are recorded into `context` before any extractor runs, so the
    /// audit entry exists even when nothing is extracted.
    pub fn extract(
        &self,
        input: &ExtractionInput,
        gathering: Option<&str>,
        context: &mut MultiModalContext,
    ) -> ExtractionResult {
        Self::record(input, context);

        let ctx = ExtractionContext {
            registry: &self.registry,
            gathering,
        };

        let mut merged = ExtractionResult::new();
        for extractor in self.extractors.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| extractor.extract(input, &ctx)));
            match outcome {
                Ok(Ok(result)) => {
                    let accepted: ExtractionResult = result
                        .iter()
                        .filter(|(slot, _)| {
                            let known = self.registry.contains(slot);
                            if !known {
                                tracing::warn!(
                                    extractor = extractor.name(),
                                    slot = %slot,
                                    "Extractor produced unknown slot, dropping"
                                );
                            }
                            known
                        })
                        .map(|(slot, value)| (slot.clone(), value.clone()))
                        .collect();
                    merged.merge(accepted);
                }
                Ok(Err(err)) => {
                    tracing::warn!(extractor = extractor.name(), error = %err, "Extractor failed");
                }
                Err(_) => {
                    tracing::error!(extractor = extractor.name(), "Extractor panicked");
                }
            }
        }

        tracing::debug!(slots = merged.len(), "Extraction finished");
        merged
    }

    /// Extracts from message text plus every analyzed attachment, in order.
    pub fn extract_all(
        &self,
        inputs: &[ExtractionInput],
        gathering: Option<&str>,
        context: &mut MultiModalContext,
    ) -> ExtractionResult {
        let mut merged = ExtractionResult::new();
        for input in inputs {
            merged.merge(self.extract(input, gathering, context));
        }
        merged
    }
}
