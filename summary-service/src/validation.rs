//! Post-extraction sanity checks on the structured record.
//!
//! Warnings flag gaps a clinician should review; errors mark data that must
//! not ship in a rendered summary. Only a discharge date preceding the
//! admission date is an error.

use serde::Serialize;

use extraction_engine::patterns::parse_clinical_date;
use extraction_engine::{ClinicalRecord, ConfidenceMap};

/// Outcome of validating one extracted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
    pub completeness: f64,
}

/// Validate a record against its confidence map. `threshold` is the
/// configured floor below which a populated field draws a warning.
pub fn validate(
    record: &ClinicalRecord,
    confidence: &ConfidenceMap,
    threshold: f64,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if record.patient_name.trim().is_empty() {
        warnings.push("Patient name missing".to_string());
    }
    if record.discharge_diagnosis.trim().is_empty() {
        warnings.push("Discharge diagnosis missing".to_string());
    }
    if record.admit_date.trim().is_empty() {
        warnings.push("Admission date missing".to_string());
    }
    if record.discharge_date.trim().is_empty() {
        warnings.push("Discharge date missing".to_string());
    }

    if !record.admit_date.trim().is_empty() && !record.discharge_date.trim().is_empty() {
        match (
            parse_clinical_date(&record.admit_date),
            parse_clinical_date(&record.discharge_date),
        ) {
            (Some(admit), Some(discharge)) => {
                if discharge < admit {
                    errors.push("Discharge date is before admission date".to_string());
                }
            }
            _ => warnings.push("Date format issue detected".to_string()),
        }
    }

    // ConfidenceMap iterates in key order, keeping warning order stable.
    for (field, score) in confidence {
        if *score < threshold {
            warnings.push(format!(
                "Low confidence for {} ({}%)",
                field,
                (score * 100.0).round() as u32
            ));
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        completeness: record.completeness(),
        errors,
        warnings,
    }
}
