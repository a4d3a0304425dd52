use async_trait::async_trait;

use extraction_engine::{NoteSections, PatternExtractor, TrainingState};

use crate::error::SummaryResult;
use crate::extractors::{ExtractionOutcome, Extractor};

/// Offline extractor backed by the rule-based pattern engine. Always
/// available; the hybrid method falls back to it when the external provider
/// fails.
pub struct PatternProvider;

#[async_trait]
impl Extractor for PatternProvider {
    async fn extract(
        &self,
        sections: &NoteSections,
        training: &TrainingState,
    ) -> SummaryResult<ExtractionOutcome> {
        let (record, confidence) = PatternExtractor::extract(sections, training);
        Ok(ExtractionOutcome { record, confidence })
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}
