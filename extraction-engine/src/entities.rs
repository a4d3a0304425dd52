//! Medical named-entity recognition over clinical note text.
//!
//! Built-in pattern tables cover the entity kinds a neurosurgical note
//! carries; learned patterns promoted from correction training are scanned
//! alongside them. Confidence is a deterministic function of the training
//! state, never a model output.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abbreviations::is_known_abbreviation;
use crate::training::TrainingState;

/// Occurrence threshold at which a learned entity pattern starts applying.
const LEARNED_ENTITY_THRESHOLD: u32 = 2;

/// Confidence bounds and adjustment weights for recognized entities.
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.99;
const PATTERN_BOOST: f64 = 0.02;
const CORRECTION_PENALTY: f64 = 0.05;
const DICTIONARY_BOOST: f64 = 0.15;
const SHORT_TERM_PENALTY: f64 = 0.2;
const DOSE_CONTEXT_BOOST: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "diagnosis")]
    Diagnosis,
    #[serde(rename = "medications")]
    Medication,
    #[serde(rename = "procedures")]
    Procedure,
    #[serde(rename = "complications")]
    Complication,
    #[serde(rename = "labValues")]
    LabValue,
}

impl EntityKind {
    /// Training-state key prefix for this kind; matches the serialized name.
    pub fn as_key(&self) -> &'static str {
        match self {
            EntityKind::Diagnosis => "diagnosis",
            EntityKind::Medication => "medications",
            EntityKind::Procedure => "procedures",
            EntityKind::Complication => "complications",
            EntityKind::LabValue => "labValues",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "diagnosis" => Some(EntityKind::Diagnosis),
            "medications" => Some(EntityKind::Medication),
            "procedures" => Some(EntityKind::Procedure),
            "complications" => Some(EntityKind::Complication),
            "labValues" => Some(EntityKind::LabValue),
            _ => None,
        }
    }

    pub const ALL: [EntityKind; 5] = [
        EntityKind::Diagnosis,
        EntityKind::Medication,
        EntityKind::Procedure,
        EntityKind::Complication,
        EntityKind::LabValue,
    ];
}

/// A recognized span of clinical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
    /// Deterministic confidence in `[0.1, 0.99]`.
    pub confidence: f64,
    /// Byte offset of the first occurrence in the scanned text.
    pub offset: usize,
    /// Whether this came from a correction-promoted pattern rather than the
    /// built-in tables.
    pub learned: bool,
}

#[allow(clippy::unwrap_used)]
lazy_static! {
    static ref BUILTIN_PATTERNS: Vec<(EntityKind, Regex)> = vec![
        (EntityKind::Diagnosis, Regex::new(
            r"(?i)\b(?:subarachnoid|subdural|epidural|intracerebral|intraventricular|intraparenchymal)\s+(?:hemorrhage|hematoma)\b",
        ).unwrap()),
        (EntityKind::Diagnosis, Regex::new(
            r"(?i)\b(?:(?:ruptured|unruptured)\s+)?aneurysm\b",
        ).unwrap()),
        (EntityKind::Diagnosis, Regex::new(
            r"(?i)\b(?:glioblastoma(?:\s+multiforme)?|glioma|meningioma|schwannoma|metastatic\s+(?:lesion|tumor)|brain\s+tumor)\b",
        ).unwrap()),
        (EntityKind::Diagnosis, Regex::new(
            r"(?i)\b(?:spinal\s+stenosis|herniated\s+(?:disc|disk|nucleus\s+pulposus)|spondylolisthesis|radiculopathy|myelopathy)\b",
        ).unwrap()),
        (EntityKind::Diagnosis, Regex::new(
            r"(?i)\b(?:hydrocephalus|traumatic\s+brain\s+injury|cerebral\s+edema|skull\s+fracture|seizure\s+disorder)\b",
        ).unwrap()),
        (EntityKind::Medication, Regex::new(
            r"(?i)\b(?:nimodipine|levetiracetam|phenytoin|dexamethasone|mannitol|vancomycin|cefazolin|enoxaparin|heparin|oxycodone|acetaminophen|ondansetron|famotidine|gabapentin|baclofen)\b",
        ).unwrap()),
        (EntityKind::Medication, Regex::new(
            r"(?i)\b[A-Za-z]{4,}(?:pam|olol|pril|statin|azole|mycin|cillin)\b",
        ).unwrap()),
        (EntityKind::Procedure, Regex::new(
            r"(?i)\b(?:craniotomy|craniectomy|cranioplasty|laminectomy|discectomy|corpectomy|foraminotomy|(?:spinal\s+)?fusion|decompression)\b",
        ).unwrap()),
        (EntityKind::Procedure, Regex::new(
            r"(?i)\b(?:aneurysm\s+)?(?:clipping|coiling|embolization)\b",
        ).unwrap()),
        (EntityKind::Procedure, Regex::new(
            r"(?i)\b(?:external\s+ventricular\s+drain(?:\s+placement)?|ventriculoperitoneal\s+shunt(?:\s+placement)?|hematoma\s+evacuation|tumor\s+resection|biopsy)\b",
        ).unwrap()),
        (EntityKind::Complication, Regex::new(
            r"(?i)\b(?:vasospasm|rebleed(?:ing)?|re-?hemorrhage|csf\s+leak|cerebrospinal\s+fluid\s+leak|wound\s+(?:infection|dehiscence)|meningitis|ventriculitis)\b",
        ).unwrap()),
        (EntityKind::Complication, Regex::new(
            r"(?i)\b(?:deep\s+vein\s+thrombosis|pulmonary\s+embolism|urinary\s+tract\s+infection|pneumonia|stroke|status\s+epilepticus)\b",
        ).unwrap()),
        (EntityKind::LabValue, Regex::new(
            r"(?i)\b(?:sodium|potassium|creatinine|glucose|hemoglobin|hematocrit|platelets?|wbc|inr)\s*(?:of|:|=)?\s*\d+(?:\.\d+)?\b",
        ).unwrap()),
    ];

    static ref DOSE_CONTEXT: Regex =
        Regex::new(r"(?i)\d+\s*(?:mg|mcg|g|units?|ml)\b").unwrap();
}

/// Scans `text` with the built-in tables plus any correction-promoted
/// patterns and returns deduplicated entities, highest confidence first.
pub fn extract_entities(text: &str, training: &TrainingState) -> Vec<Entity> {
    let mut found: Vec<Entity> = Vec::new();

    for (kind, pattern) in BUILTIN_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            push_entity(&mut found, text, m.as_str(), m.start(), *kind, false, training);
        }
    }

    for (kind, term) in learned_terms(&training.patterns) {
        let Ok(matcher) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&term))) else {
            continue;
        };
        for m in matcher.find_iter(text) {
            push_entity(&mut found, text, m.as_str(), m.start(), kind, true, training);
        }
    }

    // Case-insensitive dedup keeping the highest-confidence occurrence.
    let mut best: HashMap<(String, EntityKind), Entity> = HashMap::new();
    for entity in found {
        let key = (entity.text.to_lowercase(), entity.kind);
        match best.get(&key) {
            Some(existing) if existing.confidence >= entity.confidence => {}
            _ => {
                best.insert(key, entity);
            }
        }
    }

    let mut entities: Vec<Entity> = best.into_values().collect();
    entities.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.text.cmp(&b.text))
    });
    debug!(count = entities.len(), "entity recognition complete");
    entities
}

fn push_entity(
    found: &mut Vec<Entity>,
    text: &str,
    matched: &str,
    offset: usize,
    kind: EntityKind,
    learned: bool,
    training: &TrainingState,
) {
    let trimmed = matched.trim();
    if trimmed.chars().count() < 3 {
        return;
    }
    found.push(Entity {
        text: trimmed.to_string(),
        kind,
        confidence: score_entity(text, trimmed, offset, kind, training),
        offset,
        learned,
    });
}

/// Confidence of a recognized term: the model baseline adjusted by pattern
/// reinforcement, correction history, abbreviation-key membership, term
/// length, and (for medications) a nearby dose expression.
fn score_entity(
    text: &str,
    term: &str,
    offset: usize,
    kind: EntityKind,
    training: &TrainingState,
) -> f64 {
    let key = format!("{}:{}", kind.as_key(), term.to_lowercase());
    let mut confidence = training.model_confidence();
    confidence += PATTERN_BOOST * f64::from(training.pattern_count(&key));
    confidence -= CORRECTION_PENALTY * training.correction_count(&key) as f64;
    if is_known_abbreviation(term) {
        confidence += DICTIONARY_BOOST;
    }
    if term.chars().count() < 3 {
        confidence -= SHORT_TERM_PENALTY;
    }
    if kind == EntityKind::Medication && has_dose_context(text, term, offset) {
        confidence += DOSE_CONTEXT_BOOST;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// A dose expression within forty bytes after the term counts as context.
fn has_dose_context(text: &str, term: &str, offset: usize) -> bool {
    let start = offset + term.len();
    if start >= text.len() {
        return false;
    }
    let end = (start + 40).min(text.len());
    let end = (start..=end).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(start);
    DOSE_CONTEXT.is_match(&text[start..end])
}

/// Training-state keys of the form `<kind>:<term>` with a count above the
/// promotion threshold, in deterministic order.
fn learned_terms(patterns: &HashMap<String, u32>) -> Vec<(EntityKind, String)> {
    let mut terms: Vec<(EntityKind, String)> = patterns
        .iter()
        .filter(|(_, count)| **count > LEARNED_ENTITY_THRESHOLD)
        .filter_map(|(key, _)| {
            let (prefix, term) = key.split_once(':')?;
            let kind = EntityKind::from_key(prefix)?;
            if term.is_empty() || term.contains(':') {
                return None;
            }
            Some((kind, term.to_string()))
        })
        .collect();
    terms.sort_by(|a, b| a.1.cmp(&b.1));
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "Patient with subarachnoid hemorrhage from ruptured aneurysm, \
status post craniotomy for clipping. Started nimodipine 60mg PO q4h. \
Course complicated by vasospasm. Sodium 138 this morning.";

    #[test]
    fn recognizes_each_entity_kind() {
        let entities = extract_entities(NOTE, &TrainingState::default());
        let kind_of = |needle: &str| {
            entities
                .iter()
                .find(|e| e.text.to_lowercase().contains(needle))
                .map(|e| e.kind)
        };
        assert_eq!(kind_of("subarachnoid hemorrhage"), Some(EntityKind::Diagnosis));
        assert_eq!(kind_of("craniotomy"), Some(EntityKind::Procedure));
        assert_eq!(kind_of("nimodipine"), Some(EntityKind::Medication));
        assert_eq!(kind_of("vasospasm"), Some(EntityKind::Complication));
        assert_eq!(kind_of("sodium"), Some(EntityKind::LabValue));
    }

    #[test]
    fn medication_with_dose_outscores_bare_mention() {
        let with_dose = extract_entities("Started nimodipine 60mg today.", &TrainingState::default());
        let without = extract_entities("Continue nimodipine as before.", &TrainingState::default());
        let dose_conf = with_dose.iter().find(|e| e.text == "nimodipine").unwrap().confidence;
        let bare_conf = without.iter().find(|e| e.text == "nimodipine").unwrap().confidence;
        assert!(dose_conf > bare_conf);
    }

    #[test]
    fn abbreviation_keys_get_boosted_but_expansions_do_not() {
        // Expansion phrases score the bare model baseline.
        let entities =
            extract_entities("Imaging shows subarachnoid hemorrhage.", &TrainingState::default());
        let sah = entities
            .iter()
            .find(|e| e.text.to_lowercase() == "subarachnoid hemorrhage")
            .unwrap();
        assert!((sah.confidence - 0.70).abs() < 1e-9);

        // A learned term that is itself a dictionary key draws the boost.
        let mut training = TrainingState::default();
        training.patterns.insert("medications:keppra".to_string(), 3);
        training.patterns.insert("medications:zonisamide".to_string(), 3);
        let entities =
            extract_entities("Started keppra and zonisamide overnight.", &training);
        let keppra = entities.iter().find(|e| e.text == "keppra").unwrap();
        let zonisamide = entities.iter().find(|e| e.text == "zonisamide").unwrap();
        assert!((keppra.confidence - (zonisamide.confidence + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn learned_patterns_require_threshold() {
        let mut training = TrainingState::default();
        training.patterns.insert("medications:zonisamide".to_string(), 2);
        let entities = extract_entities("Continue zonisamide nightly.", &training);
        assert!(entities.iter().all(|e| e.text != "zonisamide"));

        training.patterns.insert("medications:zonisamide".to_string(), 3);
        let entities = extract_entities("Continue zonisamide nightly.", &training);
        let learned = entities.iter().find(|e| e.text == "zonisamide").unwrap();
        assert!(learned.learned);
        assert_eq!(learned.kind, EntityKind::Medication);
    }

    #[test]
    fn duplicates_collapse_case_insensitively() {
        let entities = extract_entities(
            "Craniotomy performed. Post craniotomy exam stable. CRANIOTOMY site clean.",
            &TrainingState::default(),
        );
        let count = entities
            .iter()
            .filter(|e| e.text.to_lowercase() == "craniotomy")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn ordering_is_confidence_descending_with_text_tiebreak() {
        let entities = extract_entities(NOTE, &TrainingState::default());
        for pair in entities.windows(2) {
            assert!(
                pair[0].confidence > pair[1].confidence
                    || (pair[0].confidence == pair[1].confidence && pair[0].text <= pair[1].text)
            );
        }
    }

    #[test]
    fn corrections_depress_confidence() {
        let mut training = TrainingState::default();
        let baseline = extract_entities("Continue vancomycin.", &training)
            .into_iter()
            .find(|e| e.text == "vancomycin")
            .unwrap()
            .confidence;

        training.record_correction("medications", "vancomycin", "vancomycin");
        let adjusted = extract_entities("Continue vancomycin.", &training)
            .into_iter()
            .find(|e| e.text == "vancomycin")
            .unwrap()
            .confidence;
        assert!(adjusted < baseline);
    }
}
