use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use extraction_engine::{
    expand_abbreviations, extract_entities, segment_notes, ClinicalRecord, ConfidenceMap, Entity,
    EntityKind, NoteSections, TrainingState,
};
use risk_engine::{
    detect_conditions, detect_procedures, generate_recommendations, risk, Condition, Procedure,
    RecommendationSet, RiskAssessment,
};

use crate::config::{ExtractionMethod, SummaryConfig};
use crate::error::{SummaryError, SummaryResult};
use crate::extractors::pattern::PatternProvider;
use crate::extractors::{create_extractor, ExtractionOutcome, Extractor};
use crate::renderer::{self, SummaryInputs};
use crate::store::{
    load_json, save_json, KeyValueStore, MemoryStore, LAST_RECORD_KEY, NOTE_DRAFT_KEY,
    TRAINING_STATE_KEY,
};
use crate::validation::{validate, ValidationReport};

/// Recognized entities grouped per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySets {
    pub diagnosis: Vec<Entity>,
    pub medications: Vec<Entity>,
    pub procedures: Vec<Entity>,
    pub complications: Vec<Entity>,
    pub lab_values: Vec<Entity>,
}

impl EntitySets {
    fn group(entities: Vec<Entity>) -> Self {
        let mut sets = Self::default();
        for entity in entities {
            match entity.kind {
                EntityKind::Diagnosis => sets.diagnosis.push(entity),
                EntityKind::Medication => sets.medications.push(entity),
                EntityKind::Procedure => sets.procedures.push(entity),
                EntityKind::Complication => sets.complications.push(entity),
                EntityKind::LabValue => sets.lab_values.push(entity),
            }
        }
        sets
    }
}

/// Output of one processing run. The `run_id` supersedes earlier runs: a
/// caller holding an older id can detect and discard a stale result.
#[derive(Debug, Clone)]
pub struct NoteAnalysis {
    pub run_id: Uuid,
    pub method: &'static str,
    pub record: ClinicalRecord,
    pub confidence: ConfidenceMap,
    pub entities: EntitySets,
    pub conditions: Vec<Condition>,
    pub procedures: Vec<Procedure>,
    pub recommendations: RecommendationSet,
    pub risks: RiskAssessment,
    pub validation: ValidationReport,
}

/// Discharge summary service: owns the configuration, training state, and
/// extraction providers, and runs the full note-to-summary pipeline.
pub struct DischargeSummaryService {
    config: SummaryConfig,
    store: Arc<dyn KeyValueStore>,
    training: TrainingState,
    pattern: PatternProvider,
    external: Option<Box<dyn Extractor>>,
    latest_run: Option<Uuid>,
}

impl DischargeSummaryService {
    /// Create a new service backed by an in-memory store.
    pub fn new(config: SummaryConfig) -> SummaryResult<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Create a new service over an existing store, restoring any persisted
    /// training state.
    pub fn with_store(config: SummaryConfig, store: Arc<dyn KeyValueStore>) -> SummaryResult<Self> {
        let external = match &config.provider {
            Some(provider) => Some(create_extractor(provider)?),
            None => None,
        };
        let training = load_json(store.as_ref(), TRAINING_STATE_KEY);

        Ok(Self {
            config,
            store,
            training,
            pattern: PatternProvider,
            external,
            latest_run: None,
        })
    }

    /// Replace the external extractor. Used by tests and by callers that
    /// manage provider lifecycles themselves.
    pub fn set_external_extractor(&mut self, extractor: Box<dyn Extractor>) {
        self.external = Some(extractor);
    }

    /// Segment one pasted blob of mixed notes and process it.
    pub async fn process_unified(&mut self, blob: &str) -> SummaryResult<NoteAnalysis> {
        let sections = segment_notes(blob);
        self.process_sections(&sections).await
    }

    /// Run the full pipeline over typed note sections.
    pub async fn process_sections(&mut self, sections: &NoteSections) -> SummaryResult<NoteAnalysis> {
        if sections.is_empty() {
            return Err(SummaryError::Extraction(
                "no note content to process".to_string(),
            ));
        }

        let (outcome, method) = self.run_extraction(sections).await?;

        let expanded = expand_abbreviations(&sections.combined(), &self.training.patterns);
        let entities = EntitySets::group(extract_entities(&expanded, &self.training));
        let conditions = detect_conditions(&expanded);
        let procedures = detect_procedures(&expanded);
        let recommendations = generate_recommendations(&conditions, &procedures);
        let risks = risk::assess(
            &expanded,
            &outcome.record,
            &entities.complications,
            &conditions,
            &procedures,
        );
        let validation = validate(
            &outcome.record,
            &outcome.confidence,
            self.config.confidence_threshold,
        );

        // Advisory persistence; failures are logged inside, never surfaced.
        save_json(self.store.as_ref(), NOTE_DRAFT_KEY, sections);
        save_json(self.store.as_ref(), LAST_RECORD_KEY, &outcome.record);

        let run_id = Uuid::new_v4();
        self.latest_run = Some(run_id);

        info!(
            %run_id,
            method,
            fields = outcome.record.populated_fields(),
            conditions = conditions.len(),
            warnings = validation.warnings.len(),
            "note processing complete"
        );

        Ok(NoteAnalysis {
            run_id,
            method,
            record: outcome.record,
            confidence: outcome.confidence,
            entities,
            conditions,
            procedures,
            recommendations,
            risks,
            validation,
        })
    }

    async fn run_extraction(
        &self,
        sections: &NoteSections,
    ) -> SummaryResult<(ExtractionOutcome, &'static str)> {
        match self.config.method {
            ExtractionMethod::PatternOnly => {
                let outcome = self.pattern.extract(sections, &self.training).await?;
                Ok((outcome, self.pattern.name()))
            }
            ExtractionMethod::AiOnly => match &self.external {
                Some(external) => {
                    let outcome = external.extract(sections, &self.training).await?;
                    Ok((outcome, external.name()))
                }
                None => Err(SummaryError::Config(
                    "extraction method 'ai' requires a configured provider".to_string(),
                )),
            },
            ExtractionMethod::Hybrid => match &self.external {
                Some(external) => match external.extract(sections, &self.training).await {
                    Ok(outcome) => Ok((outcome, external.name())),
                    Err(error) => {
                        warn!(%error, "external extraction failed, using offline extraction");
                        let outcome = self.pattern.extract(sections, &self.training).await?;
                        Ok((outcome, self.pattern.name()))
                    }
                },
                None => {
                    debug!("no external provider configured, using offline extraction");
                    let outcome = self.pattern.extract(sections, &self.training).await?;
                    Ok((outcome, self.pattern.name()))
                }
            },
        }
    }

    /// Render the configured summary template for one analysis.
    pub fn render_summary(&self, analysis: &NoteAnalysis, generated_at: DateTime<Utc>) -> String {
        renderer::render(
            self.config.template,
            &SummaryInputs {
                record: &analysis.record,
                recommendations: &analysis.recommendations,
                risks: &analysis.risks,
                training: &self.training,
            },
            generated_at,
        )
    }

    /// Apply one user correction and persist the updated training state.
    pub fn record_correction(&mut self, field: &str, predicted: &str, corrected: &str) {
        self.training.record_correction(field, predicted, corrected);
        save_json(self.store.as_ref(), TRAINING_STATE_KEY, &self.training);
    }

    /// Whether an analysis has been superseded by a later run.
    pub fn is_stale(&self, analysis: &NoteAnalysis) -> bool {
        self.latest_run.is_some_and(|latest| latest != analysis.run_id)
    }

    pub fn training(&self) -> &TrainingState {
        &self.training
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }
}
