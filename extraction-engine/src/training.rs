//! Correction tracking and the heuristic accuracy score.
//!
//! This is deliberately not statistical learning: accuracy is a deterministic
//! counter-driven formula, and "learned patterns" are occurrence counters
//! keyed by `field:lowercased value`. The score feeds back into entity
//! confidence and the accuracy figures shown on rendered summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Baseline accuracy before any corrections are recorded.
const BASELINE_ACCURACY: f64 = 70.0;
/// Accuracy ceiling.
const MAX_ACCURACY: f64 = 98.0;
const SAMPLE_WEIGHT: f64 = 0.5;
const CORRECTION_WEIGHT: f64 = 0.1;
const SPECIALTY_NUDGE: f64 = 0.5;

/// One user correction to an extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEntry {
    pub timestamp: DateTime<Utc>,
    pub field: String,
    /// The value the extractor produced before the correction.
    #[serde(default)]
    pub predicted: String,
    pub corrected: String,
}

/// Running accuracy score with its full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTrack {
    pub current: u32,
    pub history: Vec<u32>,
}

impl Default for AccuracyTrack {
    fn default() -> Self {
        Self {
            current: BASELINE_ACCURACY as u32,
            history: vec![BASELINE_ACCURACY as u32],
        }
    }
}

/// Persistent training state: pattern counters, the append-only correction
/// log, and the derived accuracy scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrainingState {
    /// Occurrence counters keyed `field:lowercased value` (or
    /// `abbr:token:expansion` for learned abbreviations).
    pub patterns: HashMap<String, u32>,
    pub corrections: Vec<CorrectionEntry>,
    pub total_samples: u64,
    pub accuracy: AccuracyTrack,
    pub specialty_accuracy: BTreeMap<String, f64>,
    pub model_version: String,
    pub last_updated: DateTime<Utc>,
}

impl Default for TrainingState {
    fn default() -> Self {
        let specialty_accuracy = [
            ("neurosurgery", 75.0),
            ("spine", 72.0),
            ("vascular", 70.0),
            ("tumor", 68.0),
            ("trauma", 65.0),
            ("pediatric", 60.0),
        ]
        .into_iter()
        .map(|(name, score)| (name.to_string(), score))
        .collect();

        Self {
            patterns: HashMap::new(),
            corrections: Vec::new(),
            total_samples: 0,
            accuracy: AccuracyTrack::default(),
            specialty_accuracy,
            model_version: "3.0.0".to_string(),
            last_updated: Utc::now(),
        }
    }
}

impl TrainingState {
    /// Base confidence used by the entity recognizer, in `[0, 1]`.
    pub fn model_confidence(&self) -> f64 {
        f64::from(self.accuracy.current) / 100.0
    }

    /// Occurrence count for a `field:value` pattern key.
    pub fn pattern_count(&self, key: &str) -> u32 {
        self.patterns.get(key).copied().unwrap_or(0)
    }

    /// Number of logged corrections matching a `field:lowercased corrected`
    /// key. Drives the per-entity correction penalty.
    pub fn correction_count(&self, key: &str) -> usize {
        self.corrections
            .iter()
            .filter(|c| format!("{}:{}", c.field, c.corrected.to_lowercase()) == key)
            .count()
    }

    /// Record one user correction: append to the log, bump the pattern
    /// counter, and recompute the accuracy score.
    ///
    /// Accuracy is `round(min(98, 70 + samples*0.5 - corrections*0.1))`,
    /// clamped to `[0, 98]` — a deterministic function of the two counters.
    pub fn record_correction(&mut self, field: &str, predicted: &str, corrected: &str) {
        if corrected.trim().is_empty() {
            return;
        }

        self.corrections.push(CorrectionEntry {
            timestamp: Utc::now(),
            field: field.to_string(),
            predicted: predicted.to_string(),
            corrected: corrected.to_string(),
        });

        // Abbreviation corrections accumulate on the canonical
        // `abbr:<token>:<expansion>` key so repeated corrections cross the
        // promotion threshold; everything else keys on `field:corrected`.
        let pattern_key = match field.strip_prefix("abbr:") {
            Some(rest) => {
                let token = rest.split(':').next().unwrap_or(rest);
                format!("abbr:{}:{}", token.to_lowercase(), corrected.to_lowercase())
            }
            None => format!("{}:{}", field, corrected.to_lowercase()),
        };
        *self.patterns.entry(pattern_key).or_insert(0) += 1;

        self.total_samples += 1;

        let raw = BASELINE_ACCURACY + self.total_samples as f64 * SAMPLE_WEIGHT
            - self.corrections.len() as f64 * CORRECTION_WEIGHT;
        let accuracy = raw.min(MAX_ACCURACY).max(0.0).round() as u32;
        self.accuracy.current = accuracy;
        self.accuracy.history.push(accuracy);

        if field.contains("neuro") {
            self.nudge_specialty("neurosurgery");
        } else if field.contains("spine") {
            self.nudge_specialty("spine");
        }

        self.last_updated = Utc::now();

        info!(
            field,
            accuracy,
            total_samples = self.total_samples,
            "correction recorded"
        );
    }

    fn nudge_specialty(&mut self, specialty: &str) {
        if let Some(score) = self.specialty_accuracy.get_mut(specialty) {
            *score = (*score + SPECIALTY_NUDGE).min(MAX_ACCURACY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_formula_matches_counters() {
        let mut state = TrainingState::default();
        for i in 0..10 {
            state.record_correction("dischargeDiagnosis", "old", &format!("value {i}"));
        }
        assert_eq!(state.total_samples, 10);
        assert_eq!(state.corrections.len(), 10);
        // round(min(98, 70 + 10*0.5 - 10*0.1)) == 74
        assert_eq!(state.accuracy.current, 74);
        assert_eq!(state.accuracy.history.len(), 11);
    }

    #[test]
    fn accuracy_is_capped_at_98() {
        let mut state = TrainingState::default();
        for i in 0..100 {
            state.record_correction("patientName", "", &format!("name {i}"));
        }
        assert_eq!(state.accuracy.current, 98);
    }

    #[test]
    fn pattern_counter_increments_per_identical_correction() {
        let mut state = TrainingState::default();
        state.record_correction("allergies", "", "Penicillin");
        state.record_correction("allergies", "", "penicillin");
        assert_eq!(state.pattern_count("allergies:penicillin"), 2);
        assert_eq!(state.correction_count("allergies:penicillin"), 2);
    }

    #[test]
    fn abbreviation_corrections_accumulate_one_canonical_key() {
        let mut state = TrainingState::default();
        for _ in 0..3 {
            state.record_correction("abbr:ha:headache", "", "headache");
        }
        assert_eq!(state.pattern_count("abbr:ha:headache"), 3);
        assert_eq!(state.pattern_count("abbr:ha:headache:headache"), 0);
    }

    #[test]
    fn repeated_abbreviation_corrections_teach_the_expander() {
        let mut state = TrainingState::default();

        state.record_correction("abbr:ha", "", "headache");
        state.record_correction("abbr:ha", "", "headache");
        let text = crate::abbreviations::expand_abbreviations("Worst HA of life", &state.patterns);
        assert_eq!(text, "Worst HA of life");

        state.record_correction("abbr:ha", "", "headache");
        let text = crate::abbreviations::expand_abbreviations("Worst HA of life", &state.patterns);
        assert_eq!(text, "Worst headache of life");
    }

    #[test]
    fn empty_corrections_are_ignored() {
        let mut state = TrainingState::default();
        state.record_correction("mrn", "12345", "  ");
        assert!(state.corrections.is_empty());
        assert_eq!(state.accuracy.current, 70);
    }

    #[test]
    fn specialty_nudge_applies_and_caps() {
        let mut state = TrainingState::default();
        state.record_correction("neuroExam", "", "alert and oriented");
        assert_eq!(state.specialty_accuracy["neurosurgery"], 75.5);
    }

    #[test]
    fn malformed_persisted_state_fields_take_defaults() {
        let state: TrainingState = serde_json::from_str(r#"{"totalSamples": 4}"#).expect("parse");
        assert_eq!(state.total_samples, 4);
        assert_eq!(state.accuracy.current, 70);
        assert_eq!(state.model_version, "3.0.0");
    }
}
