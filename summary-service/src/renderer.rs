//! Discharge summary rendering.
//!
//! A document is an ordered list of titled sections; conditional content
//! (wound care, vasospasm, recommendation blocks) is decided while building
//! the list, so inclusion logic is testable without inspecting the final
//! string. Rendering takes an explicit timestamp: identical inputs and
//! timestamp produce byte-identical output. Missing fields render bracketed
//! placeholders; rendering never fails.

use chrono::{DateTime, Utc};

use extraction_engine::{ClinicalRecord, TrainingState};
use risk_engine::recommendations::RecommendationSet;
use risk_engine::risk::{RiskAssessment, VasospasmRisk};

use crate::config::SummaryTemplate;

const HEAVY_RULE: &str = "════════════════════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

/// Everything a rendered summary draws from.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    pub record: &'a ClinicalRecord,
    pub recommendations: &'a RecommendationSet,
    pub risks: &'a RiskAssessment,
    pub training: &'a TrainingState,
}

struct Section {
    title: &'static str,
    body: String,
}

/// Render the summary for one template at a fixed timestamp.
pub fn render(
    template: SummaryTemplate,
    inputs: &SummaryInputs<'_>,
    generated_at: DateTime<Utc>,
) -> String {
    let sections = match template {
        SummaryTemplate::Neurosurgery => neurosurgery_sections(inputs),
        SummaryTemplate::Brief => brief_sections(inputs),
    };

    let mut out = String::new();
    out.push_str(&header(template, inputs.training, generated_at));
    for section in sections {
        out.push_str("\n\n");
        out.push_str(section.title);
        out.push('\n');
        out.push_str(LIGHT_RULE);
        out.push('\n');
        out.push_str(&section.body);
    }
    if template == SummaryTemplate::Neurosurgery {
        out.push_str("\n\n");
        out.push_str(&footer(inputs.training));
    }
    out.push('\n');
    out
}

fn header(
    template: SummaryTemplate,
    training: &TrainingState,
    generated_at: DateTime<Utc>,
) -> String {
    let title = match template {
        SummaryTemplate::Neurosurgery => "NEUROSURGERY DISCHARGE SUMMARY",
        SummaryTemplate::Brief => "DISCHARGE SUMMARY (BRIEF)",
    };
    format!(
        "{title}\n{HEAVY_RULE}\n\
         Generated with ML Intelligence (Accuracy: {}%)\n\
         Model Version: {} | Samples Trained: {}\n\
         Date Generated: {}",
        training.accuracy.current,
        training.model_version,
        training.total_samples,
        generated_at.format("%m/%d/%Y %H:%M UTC"),
    )
}

fn footer(training: &TrainingState) -> String {
    format!(
        "CLINICAL DECISION SUPPORT\n{LIGHT_RULE}\n\
         Guidelines Applied:\n\
         \u{2022} American Heart Association/American Stroke Association\n\
         \u{2022} North American Spine Society\n\
         \u{2022} Neurocritical Care Society\n\
         \u{2022} Congress of Neurological Surgeons\n\n\
         Model Accuracy: {}% | Training Samples: {}\n\n\
         {HEAVY_RULE}\n\
         This summary combines rule-based extraction with evidence-based \
         guidelines.\n\n\
         _______________________________\n\
         [Physician Name], MD\n\
         Department of Neurosurgery",
        training.accuracy.current, training.total_samples,
    )
}

fn neurosurgery_sections(inputs: &SummaryInputs<'_>) -> Vec<Section> {
    let record = inputs.record;
    let mut sections = vec![
        Section {
            title: "PATIENT IDENTIFICATION",
            body: format!(
                "Name: {}\nAge/Sex: {} years / {}\nMRN: {}\n\
                 Admission Date: {}\nDischarge Date: {}\nLength of Stay: {}",
                or_placeholder(&record.patient_name, "[Patient Name]"),
                or_placeholder(&record.age, "[Age]"),
                or_placeholder(&record.sex, "[Sex]"),
                or_placeholder(&record.mrn, "[MRN]"),
                or_placeholder(&record.admit_date, "[Admission Date]"),
                or_placeholder(&record.discharge_date, "[Discharge Date]"),
                or_placeholder(&record.los, "[LOS]"),
            ),
        },
        Section {
            title: "DIAGNOSES",
            body: diagnoses_body(record),
        },
        Section {
            title: "PROCEDURES AND OPERATIONS",
            body: numbered(&record.procedures),
        },
        Section {
            title: "HISTORY OF PRESENT ILLNESS",
            body: or_placeholder(&record.history_presenting, "[History of presenting illness]")
                .to_string(),
        },
        Section {
            title: "HOSPITAL COURSE",
            body: or_placeholder(&record.hospital_course, "[Detailed hospital course]")
                .to_string(),
        },
        Section {
            title: "COMPLICATIONS",
            body: if record.complications.is_empty() {
                "No complications noted".to_string()
            } else {
                bulleted(&record.complications)
            },
        },
        Section {
            title: "PHYSICAL EXAMINATION AT DISCHARGE",
            body: format!(
                "Vital Signs: {}\nGeneral: {}",
                or_placeholder(&record.vital_signs, "Stable, afebrile"),
                or_placeholder(&record.current_exam, "[Physical examination findings]"),
            ),
        },
        Section {
            title: "PAST MEDICAL HISTORY",
            body: bulleted(&record.pmh),
        },
        Section {
            title: "PAST SURGICAL HISTORY",
            body: bulleted(&record.psh),
        },
        Section {
            title: "ALLERGIES",
            body: or_placeholder(&record.allergies, "No Known Drug Allergies (NKDA)").to_string(),
        },
        Section {
            title: "DISCHARGE MEDICATIONS",
            body: numbered(&record.discharge_medications),
        },
    ];

    if !inputs.recommendations.medications.is_empty() {
        sections.push(Section {
            title: "EVIDENCE-BASED MEDICATION RECOMMENDATIONS",
            body: medication_recommendations(inputs.recommendations),
        });
    }

    if !inputs.recommendations.monitoring.is_empty() {
        sections.push(Section {
            title: "MONITORING PROTOCOL",
            body: monitoring_block(inputs.recommendations),
        });
    }

    sections.push(Section {
        title: "RISK ASSESSMENT",
        body: risk_block(inputs.risks),
    });

    sections.push(Section {
        title: "DISCHARGE INSTRUCTIONS",
        body: discharge_instructions(inputs),
    });

    sections.push(Section {
        title: "FOLLOW-UP APPOINTMENTS",
        body: follow_up_block(inputs),
    });

    sections
}

fn brief_sections(inputs: &SummaryInputs<'_>) -> Vec<Section> {
    let record = inputs.record;
    vec![
        Section {
            title: "PATIENT",
            body: format!(
                "{}, {} / {} | MRN {} | {} to {} ({})",
                or_placeholder(&record.patient_name, "[Patient Name]"),
                or_placeholder(&record.age, "[Age]"),
                or_placeholder(&record.sex, "[Sex]"),
                or_placeholder(&record.mrn, "[MRN]"),
                or_placeholder(&record.admit_date, "[Admission Date]"),
                or_placeholder(&record.discharge_date, "[Discharge Date]"),
                or_placeholder(&record.los, "[LOS]"),
            ),
        },
        Section {
            title: "DIAGNOSES",
            body: format!(
                "Admitting: {}\nDischarge: {}",
                or_placeholder(&record.admitting_diagnosis, "[Admitting diagnosis]"),
                or_placeholder(&record.discharge_diagnosis, "[Discharge diagnosis]"),
            ),
        },
        Section {
            title: "PROCEDURES",
            body: numbered(&record.procedures),
        },
        Section {
            title: "DISCHARGE MEDICATIONS",
            body: numbered(&record.discharge_medications),
        },
        Section {
            title: "WARNING SIGNS",
            body: bulleted_str(&inputs.recommendations.warning_signs),
        },
        Section {
            title: "FOLLOW-UP",
            body: follow_up_block(inputs),
        },
    ]
}

fn medication_recommendations(recommendations: &RecommendationSet) -> String {
    let blocks: Vec<String> = recommendations
        .medications
        .iter()
        .map(|m| {
            let mut block = format!("\u{2022} {}: {}", m.drug, m.dose);
            block.push_str(&format!(
                "\n  Duration: {}",
                m.duration.unwrap_or("Ongoing")
            ));
            if let Some(start) = m.start {
                block.push_str(&format!("\n  Start: {start}"));
            }
            if let Some(reason) = m.reason {
                block.push_str(&format!("\n  Indication: {reason}"));
            }
            block.push_str(&format!("\n  Evidence: {}", m.evidence));
            if let Some(nnt) = m.nnt {
                block.push_str(&format!("\n  NNT: {nnt}"));
            }
            block
        })
        .collect();
    blocks.join("\n\n")
}

fn monitoring_block(recommendations: &RecommendationSet) -> String {
    recommendations
        .monitoring
        .iter()
        .map(|m| {
            format!(
                "\u{2022} {} {}\n  Duration: {}\n  Reason: {}\n  Action threshold: {}",
                m.test, m.frequency, m.duration, m.reason, m.threshold,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn risk_block(risks: &RiskAssessment) -> String {
    let mut body = format!(
        "Seizure Risk: {} ({}%)\n  Factors: {}\n  {}\n\n\
         VTE Risk: {} ({}%)\n  Prophylaxis: {}\n  Timing: {}\n\n\
         Readmission Risk: {} ({}%)\n  Factors: {}\n  Mitigation: {}",
        risks.seizure.category,
        risks.seizure.percentage,
        joined_or(&risks.seizure.factors, "None identified"),
        risks.seizure.recommendation,
        risks.vte.level,
        risks.vte.percentage,
        risks.vte.prophylaxis,
        risks.vte.timing,
        risks.readmission.category,
        risks.readmission.percentage,
        joined_or(&risks.readmission.factors, "None"),
        risks.readmission.mitigation,
    );

    if let VasospasmRisk::Assessed(vasospasm) = &risks.vasospasm {
        body.push_str(&format!(
            "\n\nVasospasm Risk: {} ({}%)\n  Peak: {}\n  Monitoring: {}\n  Treatment: {}",
            vasospasm.level,
            vasospasm.percentage,
            vasospasm.peak_timing,
            vasospasm.monitoring,
            vasospasm.treatment,
        ));
    }
    body
}

fn discharge_instructions(inputs: &SummaryInputs<'_>) -> String {
    let record = inputs.record;
    let recommendations = inputs.recommendations;
    let mut body = format!(
        "Disposition: {}\nDiet: {}\nActivity: {}",
        or_placeholder(&record.disposition, "Home"),
        or_placeholder(&record.diet, "Regular diet as tolerated"),
        or_placeholder(&record.activity, "As tolerated with restrictions as discussed"),
    );

    if !recommendations.activity.is_empty() {
        body.push_str("\n\nActivity Restrictions:");
        for activity in &recommendations.activity {
            for instruction in &activity.instructions {
                body.push_str(&format!("\n\u{2022} {instruction}"));
            }
        }
    }

    if !recommendations.wound_care.is_empty() {
        body.push_str("\n\nWound Care:");
        for wound in &recommendations.wound_care {
            body.push_str(&format!(
                "\n\u{2022} {}\n  Showering: {}\n  Watch for: {}",
                wound.instruction, wound.showering, wound.watch_for,
            ));
        }
    }

    body.push_str("\n\nWarning Signs - Return to ED for:\n");
    body.push_str(&bulleted_str(&recommendations.warning_signs));
    body
}

fn follow_up_block(inputs: &SummaryInputs<'_>) -> String {
    let mut body = bulleted(&inputs.record.follow_up);
    if !inputs.recommendations.follow_up.is_empty() {
        body.push_str("\n\nRecommended Follow-up:");
        for follow in &inputs.recommendations.follow_up {
            body.push_str(&format!(
                "\n\u{2022} {} - {}\n  Reason: {}\n  Tests needed: {}",
                follow.specialty, follow.timing, follow.reason, follow.tests,
            ));
        }
    }
    body
}

fn diagnoses_body(record: &ClinicalRecord) -> String {
    let mut body = format!(
        "Admitting Diagnosis:\n{}\n\nDischarge Diagnosis:\n{}",
        or_placeholder(&record.admitting_diagnosis, "[Admitting diagnosis]"),
        or_placeholder(&record.discharge_diagnosis, "[Discharge diagnosis]"),
    );
    // Post-operative diagnosis line only when surgery happened and the
    // discharge diagnosis actually changed from admission.
    let admitting = record.admitting_diagnosis.trim();
    let discharge = record.discharge_diagnosis.trim();
    if !record.procedures.is_empty()
        && !discharge.is_empty()
        && !admitting.eq_ignore_ascii_case(discharge)
    {
        body.push_str(&format!("\n\nPost-operative Diagnosis:\n{discharge}"));
    }
    body
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn bulleted(items: &[String]) -> String {
    if items.is_empty() {
        return "None documented".to_string();
    }
    items
        .iter()
        .map(|item| format!("\u{2022} {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bulleted_str(items: &[&str]) -> String {
    if items.is_empty() {
        return "None documented".to_string();
    }
    items
        .iter()
        .map(|item| format!("\u{2022} {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn joined_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn numbered(items: &[String]) -> String {
    if items.is_empty() {
        return "None documented".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use risk_engine::{detect_conditions, detect_procedures, generate_recommendations, risk};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 25, 14, 30, 0).unwrap()
    }

    fn sample_inputs(text: &str, record: &ClinicalRecord) -> (RecommendationSet, RiskAssessment) {
        let conditions = detect_conditions(text);
        let procedures = detect_procedures(text);
        let recommendations = generate_recommendations(&conditions, &procedures);
        let risks = risk::assess(text, record, &[], &conditions, &procedures);
        (recommendations, risks)
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut record = ClinicalRecord::default();
        record.patient_name = "John Carter".to_string();
        record.discharge_diagnosis = "Subarachnoid hemorrhage".to_string();
        let (recommendations, risks) =
            sample_inputs("subarachnoid hemorrhage, craniotomy for clipping", &record);
        let training = TrainingState::default();
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };

        let first = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        let second = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert_eq!(first, second);

        let brief_a = render(SummaryTemplate::Brief, &inputs, fixed_time());
        let brief_b = render(SummaryTemplate::Brief, &inputs, fixed_time());
        assert_eq!(brief_a, brief_b);
        assert_ne!(first, brief_a);
    }

    #[test]
    fn empty_record_renders_placeholders() {
        let record = ClinicalRecord::default();
        let (recommendations, risks) = sample_inputs("", &record);
        let training = TrainingState::default();
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };

        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(summary.contains("[Patient Name]"));
        assert!(summary.contains("[Discharge diagnosis]"));
        assert!(summary.contains("No Known Drug Allergies (NKDA)"));
        assert!(summary.contains("No complications noted"));
    }

    #[test]
    fn vasospasm_block_only_renders_after_sah() {
        let record = ClinicalRecord::default();
        let (recommendations, risks) = sample_inputs("subarachnoid hemorrhage", &record);
        let training = TrainingState::default();
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };
        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(summary.contains("Vasospasm Risk:"));

        let (recommendations, risks) = sample_inputs("lumbar stenosis", &record);
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };
        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(!summary.contains("Vasospasm Risk:"));
    }

    #[test]
    fn wound_care_requires_a_procedure() {
        let record = ClinicalRecord::default();
        let (recommendations, risks) = sample_inputs("craniotomy performed", &record);
        let training = TrainingState::default();
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };
        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(summary.contains("Wound Care:"));
        assert!(summary.contains("Keep incision clean and dry"));

        let (recommendations, risks) = sample_inputs("", &record);
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };
        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(!summary.contains("Wound Care:"));
    }

    #[test]
    fn recommendation_block_lists_nimodipine_for_sah() {
        let mut record = ClinicalRecord::default();
        record.discharge_diagnosis = "Subarachnoid hemorrhage".to_string();
        let (recommendations, risks) = sample_inputs("subarachnoid hemorrhage", &record);
        let training = TrainingState::default();
        let inputs = SummaryInputs {
            record: &record,
            recommendations: &recommendations,
            risks: &risks,
            training: &training,
        };
        let summary = render(SummaryTemplate::Neurosurgery, &inputs, fixed_time());
        assert!(summary.contains("EVIDENCE-BASED MEDICATION RECOMMENDATIONS"));
        assert!(summary.contains("\u{2022} Nimodipine: 60mg PO q4h"));
        assert!(summary.contains("NNT: 13"));
        assert!(summary.contains("MONITORING PROTOCOL"));
    }

    #[test]
    fn post_op_diagnosis_only_when_distinct_after_surgery() {
        let mut record = ClinicalRecord::default();
        record.admitting_diagnosis = "Cerebral aneurysm".to_string();
        record.discharge_diagnosis = "Cerebral aneurysm, clipped".to_string();

        // No procedures recorded, no post-op line.
        assert!(!diagnoses_body(&record).contains("Post-operative Diagnosis:"));

        record.procedures = vec!["Craniotomy for aneurysm clipping".to_string()];
        assert!(diagnoses_body(&record).contains("Post-operative Diagnosis:"));

        // Unchanged diagnosis renders no post-op line even after surgery.
        record.discharge_diagnosis = "cerebral aneurysm".to_string();
        assert!(!diagnoses_body(&record).contains("Post-operative Diagnosis:"));
    }
}
