use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-field extraction confidence in `[0, 1]`.
///
/// Fields that were never matched are absent, not zero. A `BTreeMap` keeps
/// iteration deterministic so validation warnings and rendered output are
/// reproducible.
pub type ConfidenceMap = BTreeMap<String, f64>;

/// Structured discharge-summary record extracted from clinical notes.
///
/// Every field is always present; absence is an empty string or empty list,
/// never a missing key. Field names serialize in camelCase, which is also the
/// JSON shape requested from the external extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalRecord {
    pub patient_name: String,
    pub age: String,
    pub sex: String,
    pub mrn: String,
    pub admit_date: String,
    pub discharge_date: String,
    pub admitting_diagnosis: String,
    pub discharge_diagnosis: String,
    pub procedures: Vec<String>,
    pub complications: Vec<String>,
    pub history_presenting: String,
    pub hospital_course: String,
    pub current_exam: String,
    pub vital_signs: String,
    pub discharge_medications: Vec<String>,
    pub allergies: String,
    pub pmh: Vec<String>,
    pub psh: Vec<String>,
    pub disposition: String,
    pub diet: String,
    pub activity: String,
    pub follow_up: Vec<String>,
    /// Length of stay, derived from the admit/discharge dates.
    pub los: String,
}

impl ClinicalRecord {
    /// Field names in record order, used for completeness scoring and for
    /// assigning uniform confidence to externally extracted records.
    pub const FIELD_NAMES: [&'static str; 23] = [
        "patientName",
        "age",
        "sex",
        "mrn",
        "admitDate",
        "dischargeDate",
        "admittingDiagnosis",
        "dischargeDiagnosis",
        "procedures",
        "complications",
        "historyPresenting",
        "hospitalCourse",
        "currentExam",
        "vitalSigns",
        "dischargeMedications",
        "allergies",
        "pmh",
        "psh",
        "disposition",
        "diet",
        "activity",
        "followUp",
        "los",
    ];

    /// Count of fields carrying a non-empty value.
    pub fn populated_fields(&self) -> usize {
        let strings = [
            &self.patient_name,
            &self.age,
            &self.sex,
            &self.mrn,
            &self.admit_date,
            &self.discharge_date,
            &self.admitting_diagnosis,
            &self.discharge_diagnosis,
            &self.history_presenting,
            &self.hospital_course,
            &self.current_exam,
            &self.vital_signs,
            &self.allergies,
            &self.disposition,
            &self.diet,
            &self.activity,
            &self.los,
        ];
        let lists = [
            &self.procedures,
            &self.complications,
            &self.discharge_medications,
            &self.pmh,
            &self.psh,
            &self.follow_up,
        ];
        strings.iter().filter(|s| !s.trim().is_empty()).count()
            + lists.iter().filter(|l| !l.is_empty()).count()
    }

    /// Completeness ratio over all record fields.
    pub fn completeness(&self) -> f64 {
        self.populated_fields() as f64 / Self::FIELD_NAMES.len() as f64
    }

    /// Overwrite a single field by its camelCase name. Whole-value
    /// replacement: list fields take the full new list, scalars the full new
    /// string. Unknown names are ignored.
    pub fn set_field(&mut self, field: &str, value: FieldValue) {
        match (field, value) {
            ("patientName", FieldValue::Text(v)) => self.patient_name = v,
            ("age", FieldValue::Text(v)) => self.age = v,
            ("sex", FieldValue::Text(v)) => self.sex = v,
            ("mrn", FieldValue::Text(v)) => self.mrn = v,
            ("admitDate", FieldValue::Text(v)) => self.admit_date = v,
            ("dischargeDate", FieldValue::Text(v)) => self.discharge_date = v,
            ("admittingDiagnosis", FieldValue::Text(v)) => self.admitting_diagnosis = v,
            ("dischargeDiagnosis", FieldValue::Text(v)) => self.discharge_diagnosis = v,
            ("historyPresenting", FieldValue::Text(v)) => self.history_presenting = v,
            ("hospitalCourse", FieldValue::Text(v)) => self.hospital_course = v,
            ("currentExam", FieldValue::Text(v)) => self.current_exam = v,
            ("vitalSigns", FieldValue::Text(v)) => self.vital_signs = v,
            ("allergies", FieldValue::Text(v)) => self.allergies = v,
            ("disposition", FieldValue::Text(v)) => self.disposition = v,
            ("diet", FieldValue::Text(v)) => self.diet = v,
            ("activity", FieldValue::Text(v)) => self.activity = v,
            ("los", FieldValue::Text(v)) => self.los = v,
            ("procedures", FieldValue::List(v)) => self.procedures = v,
            ("complications", FieldValue::List(v)) => self.complications = v,
            ("dischargeMedications", FieldValue::List(v)) => self.discharge_medications = v,
            ("pmh", FieldValue::List(v)) => self.pmh = v,
            ("psh", FieldValue::List(v)) => self.psh = v,
            ("followUp", FieldValue::List(v)) => self.follow_up = v,
            _ => {}
        }
    }
}

/// A whole-field replacement value for [`ClinicalRecord::set_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Typed note sections, either supplied separately by the caller or produced
/// by the segmenter from one unified blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteSections {
    pub admission: String,
    pub progress: String,
    pub consultant: String,
    pub procedure: String,
    #[serde(rename = "final")]
    pub final_note: String,
}

impl NoteSections {
    /// All non-empty sections joined in section order.
    pub fn combined(&self) -> String {
        [
            &self.admission,
            &self.progress,
            &self.consultant,
            &self.procedure,
            &self.final_note,
        ]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.combined().trim().is_empty()
    }
}
