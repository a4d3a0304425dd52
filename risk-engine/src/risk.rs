//! Deterministic post-neurosurgical risk scoring.
//!
//! Four additive scorers over the detected conditions/procedures and the
//! expanded note text. Weights are fixed; scores clamp to `[0, 0.99]` and
//! percentages to 99 so a heuristic never presents as certainty.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use extraction_engine::{ClinicalRecord, Entity};

use crate::catalogue::{Condition, Procedure, ProcedureKind, Severity};

const SCORE_CAP: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskCategory::Low => write!(f, "Low"),
            RiskCategory::Moderate => write!(f, "Moderate"),
            RiskCategory::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeizureRisk {
    pub score: f64,
    pub percentage: u32,
    pub category: RiskCategory,
    pub factors: Vec<String>,
    pub prophylaxis: bool,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VteRisk {
    pub score: f64,
    pub percentage: u32,
    pub level: RiskCategory,
    pub factors: Vec<String>,
    pub prophylaxis: &'static str,
    pub timing: &'static str,
    pub caprini_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmissionRisk {
    pub score: f64,
    pub percentage: u32,
    pub category: RiskCategory,
    pub factors: Vec<String>,
    pub mitigation: &'static str,
    pub lace_score: u32,
}

/// Vasospasm scoring only applies after subarachnoid hemorrhage; for every
/// other admission the assessment is explicitly not indicated rather than a
/// zero score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VasospasmRisk {
    NotApplicable,
    Assessed(VasospasmAssessment),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VasospasmAssessment {
    pub score: f64,
    pub percentage: u32,
    pub level: RiskCategory,
    pub factors: Vec<String>,
    pub peak_timing: &'static str,
    pub monitoring: &'static str,
    pub treatment: &'static str,
    pub threshold: &'static str,
}

/// The full per-admission risk profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub seizure: SeizureRisk,
    pub vte: VteRisk,
    pub readmission: ReadmissionRisk,
    pub vasospasm: VasospasmRisk,
}

#[allow(clippy::unwrap_used)]
lazy_static! {
    static ref FISHER_GRADE: Regex =
        Regex::new(r"(?i)fisher\s*(?:grade)?\s*(\d)").unwrap();
    static ref HUNT_HESS_GRADE: Regex =
        Regex::new(r"(?i)hunt[\s-]?hess\s*(?:grade)?\s*(\d)").unwrap();
}

/// Runs all four scorers against one admission. `detected_complications`
/// carries complication entities recognized in the note text, unioned with
/// the record's complications list for readmission scoring.
pub fn assess(
    text: &str,
    record: &ClinicalRecord,
    detected_complications: &[Entity],
    conditions: &[Condition],
    procedures: &[Procedure],
) -> RiskAssessment {
    RiskAssessment {
        seizure: assess_seizure(text, conditions, procedures),
        vte: assess_vte(text, procedures),
        readmission: assess_readmission(record, detected_complications, conditions),
        vasospasm: assess_vasospasm(text, conditions),
    }
}

fn capped(raw: f64) -> f64 {
    raw.min(SCORE_CAP)
}

fn percentage(raw: f64) -> u32 {
    (raw * 100.0).min(99.0).round().max(0.0) as u32
}

pub fn assess_seizure(
    text: &str,
    conditions: &[Condition],
    procedures: &[Procedure],
) -> SeizureRisk {
    let mut raw = 0.0;
    let mut factors = Vec::new();
    let lower = text.to_lowercase();

    if procedures.iter().any(|p| p.name.contains("Craniotomy")) {
        raw += 0.3;
        factors.push("Craniotomy performed".to_string());
    }
    if conditions.iter().any(|c| c.name == "Traumatic Brain Injury") {
        raw += 0.4;
        factors.push("Traumatic brain injury".to_string());
    }
    if conditions.iter().any(|c| c.name == "Brain Tumor") {
        raw += 0.25;
        factors.push("Brain tumor".to_string());
    }
    if lower.contains("cortical") || lower.contains("frontal") {
        raw += 0.2;
        factors.push("Cortical involvement".to_string());
    }
    if lower.contains("hemorrhage") {
        raw += 0.2;
        factors.push("Intracranial hemorrhage".to_string());
    }

    let prophylaxis = raw >= 0.5;
    SeizureRisk {
        score: capped(raw),
        percentage: percentage(raw),
        category: category_for(raw, 0.3, 0.6),
        factors,
        prophylaxis,
        recommendation: if prophylaxis {
            "Levetiracetam 1000mg BID x 7 days recommended"
        } else {
            "Seizure prophylaxis not routinely indicated"
        },
    }
}

pub fn assess_vte(text: &str, procedures: &[Procedure]) -> VteRisk {
    let mut raw = 0.0;
    let mut factors = Vec::new();
    let lower = text.to_lowercase();

    if procedures.iter().any(|p| p.kind == ProcedureKind::Major) {
        raw += 0.3;
        factors.push("Major neurosurgical procedure".to_string());
    }
    if procedures.iter().any(|p| p.name.contains("Spinal Fusion")) {
        raw += 0.4;
        factors.push("Spinal fusion surgery".to_string());
    }
    if lower.contains("prolonged surgery") {
        raw += 0.2;
        factors.push("Prolonged operative time".to_string());
    }
    if lower.contains("malignancy") {
        raw += 0.25;
        factors.push("Active malignancy".to_string());
    }

    let level = category_for(raw, 0.3, 0.6);
    VteRisk {
        score: capped(raw),
        percentage: percentage(raw),
        level,
        factors,
        prophylaxis: match level {
            RiskCategory::Low => "Early mobilization only",
            RiskCategory::Moderate => "Mechanical + consider chemical",
            RiskCategory::High => "Chemical + mechanical required",
        },
        timing: if level == RiskCategory::High {
            "Start POD#1"
        } else {
            "Start POD#2-3"
        },
        caprini_score: (raw * 15.0).round() as u32,
    }
}

/// Readmission reads the structured record unioned with recognized
/// complication entities, the medication burden at discharge, and whether
/// any detected condition is critical.
pub fn assess_readmission(
    record: &ClinicalRecord,
    detected_complications: &[Entity],
    conditions: &[Condition],
) -> ReadmissionRisk {
    let mut raw = 0.0;
    let mut factors = Vec::new();

    if !record.complications.is_empty() || !detected_complications.is_empty() {
        raw += 0.25;
        factors.push("In-hospital complications".to_string());
    }
    if record.discharge_medications.len() > 10 {
        raw += 0.15;
        factors.push("Polypharmacy (>10 medications)".to_string());
    }
    if conditions.iter().any(|c| c.severity == Severity::Critical) {
        raw += 0.2;
        factors.push("Critical condition".to_string());
    }

    ReadmissionRisk {
        score: capped(raw),
        percentage: percentage(raw),
        category: category_for(raw, 0.2, 0.4),
        factors,
        mitigation: if raw >= 0.4 {
            "Early follow-up (within 7 days), home health, medication reconciliation"
        } else {
            "Standard follow-up appropriate"
        },
        lace_score: (raw * 10.0).round() as u32,
    }
}

pub fn assess_vasospasm(text: &str, conditions: &[Condition]) -> VasospasmRisk {
    if !conditions.iter().any(|c| c.name == "Subarachnoid Hemorrhage") {
        return VasospasmRisk::NotApplicable;
    }

    // Baseline risk after any subarachnoid hemorrhage.
    let mut raw = 0.5;
    let mut factors = Vec::new();

    if let Some(grade) = captured_grade(&FISHER_GRADE, text) {
        if grade >= 3 {
            raw += 0.25;
            factors.push(format!("Fisher grade {grade}"));
        }
    }
    if let Some(grade) = captured_grade(&HUNT_HESS_GRADE, text) {
        if grade >= 4 {
            raw += 0.25;
            factors.push(format!("Hunt-Hess grade {grade}"));
        }
    }

    VasospasmRisk::Assessed(VasospasmAssessment {
        score: capped(raw),
        percentage: percentage(raw),
        level: category_for(raw, 0.4, 0.7),
        factors,
        peak_timing: "Days 4-14 post-hemorrhage",
        monitoring: "Daily TCDs from day 3-14",
        treatment: "Nimodipine 60mg q4h x 21 days",
        threshold: "MCA velocity >120 cm/s",
    })
}

fn category_for(raw: f64, low_below: f64, moderate_below: f64) -> RiskCategory {
    if raw < low_below {
        RiskCategory::Low
    } else if raw < moderate_below {
        RiskCategory::Moderate
    } else {
        RiskCategory::High
    }
}

fn captured_grade(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{detect_conditions, detect_procedures};
    use extraction_engine::{extract_entities, TrainingState};

    #[test]
    fn seizure_risk_accumulates_and_caps() {
        let text = "Craniotomy for frontal traumatic brain injury with hemorrhage";
        let conditions = detect_conditions(text);
        let procedures = detect_procedures(text);
        let risk = assess_seizure(text, &conditions, &procedures);

        // 0.3 + 0.4 + 0.2 + 0.2 = 1.1, capped.
        assert_eq!(risk.score, 0.99);
        assert_eq!(risk.percentage, 99);
        assert_eq!(risk.category, RiskCategory::High);
        assert!(risk.prophylaxis);
        assert_eq!(risk.factors.len(), 4);
    }

    #[test]
    fn seizure_risk_low_without_factors() {
        let risk = assess_seizure("lumbar stenosis", &detect_conditions("lumbar stenosis"), &[]);
        assert_eq!(risk.score, 0.0);
        assert_eq!(risk.category, RiskCategory::Low);
        assert!(!risk.prophylaxis);
        assert_eq!(risk.recommendation, "Seizure prophylaxis not routinely indicated");
    }

    #[test]
    fn vte_fusion_is_high_risk() {
        let text = "Underwent L4-5 spinal fusion, prolonged surgery";
        let procedures = detect_procedures(text);
        let risk = assess_vte(text, &procedures);

        // major 0.3 + fusion 0.4 + prolonged 0.2 = 0.9
        assert!((risk.score - 0.9).abs() < 1e-9);
        assert_eq!(risk.percentage, 90);
        assert_eq!(risk.level, RiskCategory::High);
        assert_eq!(risk.prophylaxis, "Chemical + mechanical required");
        assert_eq!(risk.timing, "Start POD#1");
        assert_eq!(risk.caprini_score, 13);
    }

    #[test]
    fn readmission_counts_record_signals() {
        let mut record = ClinicalRecord::default();
        record.complications = vec!["vasospasm".to_string()];
        record.discharge_medications = (0..11).map(|i| format!("med {i}")).collect();
        let conditions = detect_conditions("subarachnoid hemorrhage");

        let risk = assess_readmission(&record, &[], &conditions);
        // 0.25 + 0.15 + 0.2 = 0.6
        assert!((risk.score - 0.6).abs() < 1e-9);
        assert_eq!(risk.category, RiskCategory::High);
        assert_eq!(risk.lace_score, 6);
        assert_eq!(
            risk.mitigation,
            "Early follow-up (within 7 days), home health, medication reconciliation"
        );
    }

    #[test]
    fn readmission_counts_recognized_complications_without_record_entries() {
        let detected = extract_entities("Course complicated by vasospasm.", &TrainingState::default());
        assert!(!detected.is_empty());

        let risk = assess_readmission(&ClinicalRecord::default(), &detected, &[]);
        assert!((risk.score - 0.25).abs() < 1e-9);
        assert_eq!(risk.factors, vec!["In-hospital complications"]);
    }

    #[test]
    fn readmission_clean_course_is_low() {
        let risk = assess_readmission(&ClinicalRecord::default(), &[], &[]);
        assert_eq!(risk.score, 0.0);
        assert_eq!(risk.category, RiskCategory::Low);
        assert_eq!(risk.mitigation, "Standard follow-up appropriate");
    }

    #[test]
    fn vasospasm_not_applicable_without_sah() {
        let conditions = detect_conditions("subdural hematoma");
        assert_eq!(
            assess_vasospasm("subdural hematoma", &conditions),
            VasospasmRisk::NotApplicable
        );
    }

    #[test]
    fn vasospasm_grades_raise_baseline() {
        let text = "SAH, Fisher grade 4, Hunt-Hess grade 4";
        let conditions = detect_conditions(text);
        let VasospasmRisk::Assessed(assessment) = assess_vasospasm(text, &conditions) else {
            panic!("expected assessment");
        };
        // 0.5 + 0.25 + 0.25 = 1.0, capped.
        assert_eq!(assessment.score, 0.99);
        assert_eq!(assessment.percentage, 99);
        assert_eq!(assessment.level, RiskCategory::High);
        assert_eq!(assessment.factors, vec!["Fisher grade 4", "Hunt-Hess grade 4"]);
    }

    #[test]
    fn vasospasm_baseline_is_moderate() {
        let conditions = detect_conditions("subarachnoid hemorrhage");
        let VasospasmRisk::Assessed(assessment) =
            assess_vasospasm("subarachnoid hemorrhage, Fisher grade 2", &conditions)
        else {
            panic!("expected assessment");
        };
        assert!((assessment.score - 0.5).abs() < 1e-9);
        assert_eq!(assessment.level, RiskCategory::Moderate);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn vasospasm_serializes_with_a_status_tag() {
        let not_applicable =
            serde_json::to_value(VasospasmRisk::NotApplicable).expect("serialize");
        assert_eq!(not_applicable["status"], "notApplicable");

        let conditions = detect_conditions("subarachnoid hemorrhage");
        let assessed = assess_vasospasm("SAH, Fisher grade 3", &conditions);
        let json = serde_json::to_value(&assessed).expect("serialize");
        assert_eq!(json["status"], "assessed");
        assert_eq!(json["treatment"], "Nimodipine 60mg q4h x 21 days");
    }
}
