//! Rule-based field extraction from segmented clinical notes.
//!
//! Each discharge-summary field is backed by an ordered list of compiled
//! patterns; the first capture wins. Fields are pulled from the note
//! section they belong to (demographics from admission, course from
//! progress, discharge data from the final note) and fall back to the
//! combined text when that section is empty.

use std::collections::HashSet;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::abbreviations::expand_abbreviations;
use crate::record::{ClinicalRecord, ConfidenceMap, FieldValue, NoteSections};
use crate::training::TrainingState;

// Pattern literals are validated by the table tests below.
#[allow(clippy::unwrap_used)]
lazy_static! {
    static ref PATIENT_NAME: Vec<Regex> = vec![
        Regex::new(r"(?:Patient Name|Patient|Name|Mr\.|Mrs\.|Ms\.)\s*:?\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap(),
        Regex::new(r"(?m)^([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+is\s+a\s+\d+").unwrap(),
        Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,3}),?\s+(?:a\s+)?\d{1,3}[\s-]*(?:year|yo)").unwrap(),
    ];
    static ref AGE: Vec<Regex> = vec![
        Regex::new(r"(?i)(\d{1,3})[\s-]*(?:year|yo\b|y\.o\.|y/o)").unwrap(),
        Regex::new(r"(?i)Age\s*:?\s*(\d{1,3})").unwrap(),
    ];
    static ref SEX: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(male|female|man|woman)\b").unwrap(),
    ];
    static ref MRN: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:MRN|Medical Record Number|MR#)\s*:?\s*(\d{6,10})").unwrap(),
        Regex::new(r"(?i)(?:Record|Chart)\s*#?\s*:?\s*(\d+)").unwrap(),
    ];
    static ref ADMIT_DATE: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Date of (?:Admission|Admit)|Admission Date|Admitted(?:\s+on)?|DOA)\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
    ];
    static ref DISCHARGE_DATE: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Date of Discharge|Discharge Date|Discharged?(?:\s+on)?|DOD)\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").unwrap(),
    ];
    static ref ADMITTING_DIAGNOSIS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Admitting Diagnosis|Admission Diagnosis|Admit Dx|Chief Complaint|\bCC\b)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref DISCHARGE_DIAGNOSIS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Discharge Diagnosis|Final Diagnosis|Principal Diagnosis|Primary Diagnosis)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref HISTORY_PRESENTING: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:HPI|History of Present Illness|Presenting Complaint)\s*:?\s*(.{20,500}?)(?:\n\n|PMH|Past Medical|ROS\b|Physical Exam|$)").unwrap(),
    ];
    static ref PAST_MEDICAL: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:PMH|Past Medical History)\s*:?\s*(.{5,300}?)(?:\n\n|PSH|Past Surgical|Social|Family|Medications|Allerg|$)").unwrap(),
    ];
    static ref PAST_SURGICAL: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:PSH|Past Surgical History)\s*:?\s*(.{5,300}?)(?:\n\n|Social|Family|Medications|Allerg|$)").unwrap(),
    ];
    static ref ALLERGIES: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Allergies|Allergy|NKDA)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref HOSPITAL_COURSE: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:Hospital Course|Clinical Course|Overnight|Events)\s*:?\s*(.{20,1000}?)(?:\n\n|Plan:|Discharge|$)").unwrap(),
    ];
    static ref PROCEDURES: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Procedures?|Operation|Surgery)(?:\s+Performed)?\s*:\s*([^\n]+)").unwrap(),
    ];
    static ref COMPLICATIONS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Complications?|Adverse Events?)\s*:\s*([^\n]+)").unwrap(),
    ];
    static ref CURRENT_EXAM: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:Discharge Exam|Physical Exam(?:ination)?|Exam)\s*:?\s*(.{20,400}?)(?:\n\n|Labs|Medications|Plan|Vital|$)").unwrap(),
    ];
    static ref VITAL_SIGNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Vital Signs|Vitals|\bVS\b)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref DISCHARGE_MEDICATIONS: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:Discharge Medications?|Medications (?:at|on) Discharge|\bMeds\b)\s*:?\s*(.{5,500}?)(?:\n\n|Follow|Activity|Diet|Disposition|$)").unwrap(),
    ];
    static ref DISPOSITION: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Disposition|Discharged?\s+to)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref DIET: Vec<Regex> = vec![
        Regex::new(r"(?i)Diet\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref ACTIVITY: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Activity|Restrictions?)\s*:?\s*([^\n]+)").unwrap(),
    ];
    static ref FOLLOW_UP: Vec<Regex> = vec![
        Regex::new(r"(?is)(?:Follow[\s-]?up|F/U|Appointments?)\s*:?\s*(.{5,300}?)(?:\n\n|Warning|Instructions|$)").unwrap(),
    ];
}

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"];

/// Rule-based extractor over segmented, abbreviation-expanded note text.
pub struct PatternExtractor;

impl PatternExtractor {
    /// Runs every field pattern against the appropriate note section and
    /// returns the populated record alongside per-field confidences.
    pub fn extract(sections: &NoteSections, training: &TrainingState) -> (ClinicalRecord, ConfidenceMap) {
        let admission = expand_abbreviations(&sections.admission, &training.patterns);
        let progress = expand_abbreviations(&sections.progress, &training.patterns);
        let procedure = expand_abbreviations(&sections.procedure, &training.patterns);
        let final_note = expand_abbreviations(&sections.final_note, &training.patterns);
        let combined = [
            admission.as_str(),
            progress.as_str(),
            expand_abbreviations(&sections.consultant, &training.patterns).as_str(),
            procedure.as_str(),
            final_note.as_str(),
        ]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

        let admission_text = pick(&admission, &combined);
        let final_text = pick(&final_note, &combined);

        let mut record = ClinicalRecord::default();
        let mut scores = ConfidenceMap::new();

        let mut put = |record: &mut ClinicalRecord,
                       scores: &mut ConfidenceMap,
                       field: &str,
                       value: Option<FieldValue>,
                       confidence: f64| {
            if let Some(value) = value {
                record.set_field(field, value);
                scores.insert(field.to_string(), confidence);
            }
        };

        put(&mut record, &mut scores, "patientName",
            first_capture(admission_text, &PATIENT_NAME).map(FieldValue::Text), 0.8);
        put(&mut record, &mut scores, "age",
            first_capture(admission_text, &AGE).map(FieldValue::Text), 0.9);
        put(&mut record, &mut scores, "sex",
            first_capture(admission_text, &SEX).map(|s| FieldValue::Text(normalize_sex(&s))), 0.85);
        put(&mut record, &mut scores, "mrn",
            first_capture(admission_text, &MRN).map(FieldValue::Text), 0.95);
        put(&mut record, &mut scores, "admitDate",
            first_capture(admission_text, &ADMIT_DATE).map(FieldValue::Text), 0.9);
        put(&mut record, &mut scores, "admittingDiagnosis",
            first_capture(admission_text, &ADMITTING_DIAGNOSIS).map(FieldValue::Text), 0.8);
        put(&mut record, &mut scores, "historyPresenting",
            first_capture(admission_text, &HISTORY_PRESENTING).map(FieldValue::Text), 0.7);
        put(&mut record, &mut scores, "pmh",
            first_capture(admission_text, &PAST_MEDICAL)
                .map(|s| FieldValue::List(split_items(&s))), 0.7);
        put(&mut record, &mut scores, "psh",
            first_capture(admission_text, &PAST_SURGICAL)
                .map(|s| FieldValue::List(split_items(&s))), 0.7);
        put(&mut record, &mut scores, "allergies",
            first_capture(admission_text, &ALLERGIES).map(FieldValue::Text), 0.85);

        // Course and procedures come from the progress and operative notes;
        // scoring differs by whether the dedicated section matched.
        if let Some(course) = first_capture(&progress, &HOSPITAL_COURSE) {
            put(&mut record, &mut scores, "hospitalCourse",
                Some(FieldValue::Text(course)), 0.6);
        } else {
            put(&mut record, &mut scores, "hospitalCourse",
                first_capture(&combined, &HOSPITAL_COURSE).map(FieldValue::Text), 0.65);
        }
        record.procedures = collect_procedures(&[&procedure, &progress, &final_note, &combined]);
        record.complications = collect_complications(&[&progress, &final_note, &combined]);

        put(&mut record, &mut scores, "dischargeDate",
            first_capture(final_text, &DISCHARGE_DATE).map(FieldValue::Text), 0.9);
        put(&mut record, &mut scores, "dischargeDiagnosis",
            first_capture(final_text, &DISCHARGE_DIAGNOSIS).map(FieldValue::Text), 0.85);
        put(&mut record, &mut scores, "currentExam",
            first_capture(final_text, &CURRENT_EXAM).map(FieldValue::Text), 0.7);
        put(&mut record, &mut scores, "vitalSigns",
            first_capture(final_text, &VITAL_SIGNS).map(FieldValue::Text), 0.8);
        put(&mut record, &mut scores, "dischargeMedications",
            first_capture(final_text, &DISCHARGE_MEDICATIONS)
                .map(|s| FieldValue::List(split_lines(&s))), 0.75);
        put(&mut record, &mut scores, "diet",
            first_capture(final_text, &DIET).map(FieldValue::Text), 0.7);
        put(&mut record, &mut scores, "activity",
            first_capture(final_text, &ACTIVITY).map(FieldValue::Text), 0.7);
        put(&mut record, &mut scores, "followUp",
            first_capture(final_text, &FOLLOW_UP)
                .map(|s| FieldValue::List(split_lines(&s))), 0.6);

        match first_capture(final_text, &DISPOSITION) {
            Some(disposition) => put(&mut record, &mut scores, "disposition",
                Some(FieldValue::Text(disposition)), 0.8),
            None => record.disposition = "Home".to_string(),
        }

        record.los = compute_length_of_stay(&record.admit_date, &record.discharge_date);

        debug!(
            fields = record.populated_fields(),
            completeness = record.completeness(),
            "pattern extraction complete"
        );
        (record, scores)
    }
}

fn pick<'a>(section: &'a str, combined: &'a str) -> &'a str {
    if section.trim().is_empty() { combined } else { section }
}

fn first_capture(text: &str, patterns: &[Regex]) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(1) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn normalize_sex(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "male" | "man" => "Male".to_string(),
        "female" | "woman" => "Female".to_string(),
        other => other.to_string(),
    }
}

/// Splits a captured block on commas and newlines, dropping empties.
fn split_items(block: &str) -> Vec<String> {
    block
        .split(|c| c == ',' || c == '\n')
        .map(|item| item.trim().trim_end_matches('.').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Splits a captured block on newlines only; medication and follow-up
/// entries routinely contain commas that belong to the entry.
fn split_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', ' ']).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn collect_procedures(texts: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut procedures = Vec::new();
    for text in texts {
        for pattern in PROCEDURES.iter() {
            for caps in pattern.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    let value = m.as_str().trim().to_string();
                    if !value.is_empty() && seen.insert(value.clone()) {
                        procedures.push(value);
                    }
                }
            }
        }
    }
    procedures
}

fn collect_complications(texts: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut complications = Vec::new();
    for text in texts {
        for pattern in COMPLICATIONS.iter() {
            for caps in pattern.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    let value = m.as_str().trim().to_string();
                    let lower = value.to_lowercase();
                    if !value.is_empty()
                        && !lower.contains("none")
                        && !lower.starts_with("no ")
                        && seen.insert(value.clone())
                    {
                        complications.push(value);
                    }
                }
            }
        }
    }
    complications
}

/// Derives the stay length from the admit and discharge dates. Returns
/// `"[Calculate]"` when either date is missing or unparseable so the
/// rendered summary flags the gap instead of hiding it.
pub fn compute_length_of_stay(admit: &str, discharge: &str) -> String {
    match (parse_clinical_date(admit), parse_clinical_date(discharge)) {
        (Some(start), Some(end)) => {
            let days = (end - start).num_days();
            if days > 0 {
                format!("{days} days")
            } else {
                "1 day".to_string()
            }
        }
        _ => "[Calculate]".to_string(),
    }
}

/// Parse a clinical note date in any of the accepted `MM/DD/YYYY` variants.
pub fn parse_clinical_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::segment_notes;

    const ADMISSION_NOTE: &str = "ADMISSION NOTE\n\
Patient Name: John Carter\n\
MRN: 12345678\n\
Admission Date: 11/20/2024\n\
John Carter is a 58 year old male admitted with severe headache.\n\
Chief Complaint: Worst headache of life\n\
HPI: Patient presented to the ED with sudden onset thunderclap headache, \
nausea, and photophobia beginning three hours prior to arrival.\n\n\
PMH: Hypertension, Diabetes\n\
PSH: Appendectomy\n\
Allergies: Penicillin, Sulfa\n";

    const FINAL_NOTE: &str = "DISCHARGE NOTE\n\
Discharge Date: 11/25/2024\n\
Discharge Diagnosis: Subarachnoid hemorrhage, secured aneurysm\n\
Vital Signs: BP 128/76, HR 72, afebrile\n\
Discharge Medications:\n\
Nimodipine 60mg PO q4h\n\
Levetiracetam 1000mg BID\n\n\
Follow-up: Neurosurgery clinic in 2 weeks\n\n\
Disposition: Home with family\n";

    fn extract_sample() -> (ClinicalRecord, ConfidenceMap) {
        let blob = format!("{ADMISSION_NOTE}\n===\n{FINAL_NOTE}");
        let sections = segment_notes(&blob);
        PatternExtractor::extract(&sections, &TrainingState::default())
    }

    #[test]
    fn extracts_demographics_from_admission_note() {
        let (record, scores) = extract_sample();
        assert_eq!(record.patient_name, "John Carter");
        assert_eq!(record.age, "58");
        assert_eq!(record.sex, "Male");
        assert_eq!(record.mrn, "12345678");
        assert_eq!(scores["mrn"], 0.95);
        assert_eq!(scores["age"], 0.9);
    }

    #[test]
    fn extracts_history_and_lists() {
        let (record, scores) = extract_sample();
        assert!(record.history_presenting.contains("thunderclap headache"));
        assert_eq!(record.pmh, vec!["Hypertension", "Diabetes"]);
        assert_eq!(record.psh, vec!["Appendectomy"]);
        assert_eq!(record.allergies, "Penicillin, Sulfa");
        assert_eq!(scores["allergies"], 0.85);
    }

    #[test]
    fn extracts_discharge_fields_and_medication_lines() {
        let (record, _) = extract_sample();
        assert_eq!(record.discharge_date, "11/25/2024");
        assert!(record.discharge_diagnosis.contains("Subarachnoid hemorrhage"));
        assert_eq!(
            record.discharge_medications,
            vec!["Nimodipine 60mg PO q4h", "Levetiracetam 1000mg BID"]
        );
        assert_eq!(record.follow_up, vec!["Neurosurgery clinic in 2 weeks"]);
        assert_eq!(record.disposition, "Home with family");
    }

    #[test]
    fn length_of_stay_spans_admit_to_discharge() {
        let (record, _) = extract_sample();
        assert_eq!(record.los, "5 days");
    }

    #[test]
    fn length_of_stay_same_day_is_one_day() {
        assert_eq!(compute_length_of_stay("11/20/2024", "11/20/2024"), "1 day");
    }

    #[test]
    fn length_of_stay_unparseable_is_flagged() {
        assert_eq!(compute_length_of_stay("soon", "11/25/2024"), "[Calculate]");
        assert_eq!(compute_length_of_stay("", ""), "[Calculate]");
    }

    #[test]
    fn disposition_defaults_to_home() {
        let sections = segment_notes("Patient Name: Jane Roe\nAdmitted 11/20/2024.");
        let (record, scores) = PatternExtractor::extract(&sections, &TrainingState::default());
        assert_eq!(record.disposition, "Home");
        assert!(!scores.contains_key("disposition"));
    }

    #[test]
    fn complications_skip_negations() {
        let sections = segment_notes(
            "PROGRESS NOTE\nHospital Course: Stable overnight, tolerating diet well after surgery.\n\
Complications: None\n",
        );
        let (record, _) = PatternExtractor::extract(&sections, &TrainingState::default());
        assert!(record.complications.is_empty());
    }
}
