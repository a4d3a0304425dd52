pub mod gemini;
pub mod pattern;

use async_trait::async_trait;

use extraction_engine::{ClinicalRecord, ConfidenceMap, NoteSections, TrainingState};

use crate::config::ExtractionProvider;
use crate::error::SummaryResult;

/// One extraction run: the structured record plus per-field confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub record: ClinicalRecord,
    pub confidence: ConfidenceMap,
}

/// Trait for discharge-record extractors
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract a structured record from segmented clinical notes
    async fn extract(
        &self,
        sections: &NoteSections,
        training: &TrainingState,
    ) -> SummaryResult<ExtractionOutcome>;

    /// Short name for logs and stored drafts
    fn name(&self) -> &'static str;
}

/// Create an external extractor instance based on configuration
pub fn create_extractor(config: &ExtractionProvider) -> SummaryResult<Box<dyn Extractor>> {
    match config {
        ExtractionProvider::Gemini { .. } => {
            Ok(Box::new(gemini::GeminiExtractor::new(config)?))
        }
    }
}
