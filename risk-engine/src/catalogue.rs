//! Keyword-triggered detection of neurosurgical conditions and procedures.
//!
//! The tables are fixed clinical knowledge, not learned state: each entry
//! carries its coding data and the guideline text that downstream
//! recommendation and risk logic keys off. Detection rules are independent
//! and output preserves table order.

use serde::Serialize;
use tracing::debug;

/// Clinical acuity of a detected condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Moderate,
}

/// Operative class of a detected procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Major,
    Vascular,
    Neurosurgical,
}

/// A condition recognized in the note text, with its coding and guideline
/// attachments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: &'static str,
    pub severity: Severity,
    pub icd10: &'static str,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guideline: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<&'static str>,
}

/// A procedure recognized in the note text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub name: &'static str,
    pub kind: ProcedureKind,
    pub cpt: &'static str,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'static str>,
}

/// Scans lowercased text for known condition triggers. Rules fire
/// independently; a note can carry several conditions at once.
pub fn detect_conditions(text: &str) -> Vec<Condition> {
    let lower = text.to_lowercase();
    let mut conditions = Vec::new();

    if lower.contains("subarachnoid hemorrhage") || lower.contains("sah") || lower.contains("aneurysm") {
        conditions.push(Condition {
            name: "Subarachnoid Hemorrhage",
            severity: Severity::Critical,
            icd10: "I60.9",
            confidence: 0.95,
            guideline: Some(
                "Nimodipine 60mg PO q4h x 21 days; maintain SBP <160 mmHg until aneurysm secured",
            ),
            monitoring: Some("Daily transcranial Dopplers from day 3-14"),
            follow_up: None,
        });
    }

    if lower.contains("subdural hematoma") || lower.contains("sdh") {
        conditions.push(Condition {
            name: "Subdural Hematoma",
            severity: Severity::High,
            icd10: "I62.0",
            confidence: 0.93,
            guideline: None,
            monitoring: Some("Serial CT scans, neuro checks q2h"),
            follow_up: None,
        });
    }

    if lower.contains("glioblastoma") || lower.contains("gbm") || lower.contains("brain tumor") {
        conditions.push(Condition {
            name: "Brain Tumor",
            severity: Severity::High,
            icd10: "C71.9",
            confidence: 0.91,
            guideline: None,
            monitoring: None,
            follow_up: Some("Neuro-oncology within 2-4 weeks"),
        });
    }

    if lower.contains("stenosis") || lower.contains("herniated disc") {
        conditions.push(Condition {
            name: "Degenerative Spine Disease",
            severity: Severity::Moderate,
            icd10: "M51.9",
            confidence: 0.88,
            guideline: None,
            monitoring: None,
            follow_up: None,
        });
    }

    if lower.contains("traumatic brain injury") || lower.contains("tbi") {
        conditions.push(Condition {
            name: "Traumatic Brain Injury",
            severity: Severity::High,
            icd10: "S06.9",
            confidence: 0.92,
            guideline: Some("Levetiracetam 1000mg BID preferred over phenytoin, 7 days"),
            monitoring: None,
            follow_up: None,
        });
    }

    if lower.contains("hydrocephalus") || lower.contains("nph") {
        conditions.push(Condition {
            name: "Hydrocephalus",
            severity: Severity::Moderate,
            icd10: "G91.9",
            confidence: 0.89,
            guideline: None,
            monitoring: None,
            follow_up: None,
        });
    }

    debug!(count = conditions.len(), "condition detection complete");
    conditions
}

/// Scans lowercased text for known procedure triggers.
pub fn detect_procedures(text: &str) -> Vec<Procedure> {
    let lower = text.to_lowercase();
    let mut procedures = Vec::new();

    if lower.contains("craniotomy") {
        procedures.push(Procedure {
            name: "Craniotomy",
            kind: ProcedureKind::Major,
            cpt: "61510",
            confidence: 0.96,
            notes: Some("Cefazolin 2g IV within 60 minutes of incision"),
        });
    }

    if lower.contains("fusion")
        || lower.contains("acdf")
        || lower.contains("plif")
        || lower.contains("tlif")
    {
        procedures.push(Procedure {
            name: "Spinal Fusion",
            kind: ProcedureKind::Major,
            cpt: "22551",
            confidence: 0.94,
            notes: Some("No BLT x 6 weeks"),
        });
    }

    if lower.contains("clipping") || lower.contains("coiling") {
        procedures.push(Procedure {
            name: "Aneurysm Treatment",
            kind: ProcedureKind::Vascular,
            // Clipping takes precedence when both appear.
            cpt: if lower.contains("clipping") { "61700" } else { "61710" },
            confidence: 0.95,
            notes: Some("Daily TCDs, angiogram at 6 months"),
        });
    }

    if lower.contains("evd") || lower.contains("external ventricular drain") {
        procedures.push(Procedure {
            name: "EVD Placement",
            kind: ProcedureKind::Neurosurgical,
            cpt: "61210",
            confidence: 0.93,
            notes: Some("Prophylactic antibiotic coverage"),
        });
    }

    if lower.contains("vps") || lower.contains("ventriculoperitoneal shunt") {
        procedures.push(Procedure {
            name: "VP Shunt Placement",
            kind: ProcedureKind::Neurosurgical,
            cpt: "62223",
            confidence: 0.94,
            notes: Some("Perioperative antibiotic coverage"),
        });
    }

    debug!(count = procedures.len(), "procedure detection complete");
    procedures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sah_triggers_on_abbreviation_or_phrase() {
        for text in ["Dx: SAH", "subarachnoid hemorrhage noted", "ruptured aneurysm"] {
            let conditions = detect_conditions(text);
            assert_eq!(conditions.len(), 1, "text: {text}");
            assert_eq!(conditions[0].name, "Subarachnoid Hemorrhage");
            assert_eq!(conditions[0].icd10, "I60.9");
            assert_eq!(conditions[0].severity, Severity::Critical);
        }
    }

    #[test]
    fn multiple_conditions_preserve_table_order() {
        let conditions =
            detect_conditions("TBI with subdural hematoma, developing hydrocephalus");
        let names: Vec<&str> = conditions.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["Subdural Hematoma", "Traumatic Brain Injury", "Hydrocephalus"]
        );
    }

    #[test]
    fn clipping_selects_open_cpt_code() {
        let procedures = detect_procedures("underwent craniotomy for aneurysm clipping");
        let aneurysm = procedures.iter().find(|p| p.name == "Aneurysm Treatment").unwrap();
        assert_eq!(aneurysm.cpt, "61700");

        let procedures = detect_procedures("endovascular coiling performed");
        let aneurysm = procedures.iter().find(|p| p.name == "Aneurysm Treatment").unwrap();
        assert_eq!(aneurysm.cpt, "61710");
    }

    #[test]
    fn fusion_triggers_on_approach_abbreviations() {
        for text in ["L4-5 fusion", "s/p acdf", "underwent TLIF"] {
            let procedures = detect_procedures(text);
            assert!(
                procedures.iter().any(|p| p.name == "Spinal Fusion"),
                "text: {text}"
            );
        }
    }

    #[test]
    fn clean_text_detects_nothing() {
        assert!(detect_conditions("Patient doing well, ambulating independently").is_empty());
        assert!(detect_procedures("Patient doing well, ambulating independently").is_empty());
    }
}
