//! Evidence-based discharge recommendations keyed off detected conditions
//! and procedures.
//!
//! Output is bucketed the way the rendered summary consumes it. Every
//! recommendation string is fixed guideline text; nothing here is free-form.

use serde::Serialize;

use crate::catalogue::{Condition, Procedure};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRec {
    pub drug: &'static str,
    pub dose: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub evidence: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nnt: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringRec {
    pub test: &'static str,
    pub frequency: &'static str,
    pub duration: &'static str,
    pub reason: &'static str,
    pub threshold: &'static str,
}

/// Activity guidance tied to the condition or procedure that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRec {
    pub context: &'static str,
    pub instructions: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WoundCareRec {
    pub instruction: &'static str,
    pub showering: &'static str,
    pub watch_for: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRec {
    pub specialty: &'static str,
    pub timing: &'static str,
    pub reason: &'static str,
    pub tests: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub medications: Vec<MedicationRec>,
    pub monitoring: Vec<MonitoringRec>,
    pub activity: Vec<ActivityRec>,
    pub follow_up: Vec<FollowUpRec>,
    pub wound_care: Vec<WoundCareRec>,
    pub warning_signs: Vec<&'static str>,
}

/// Warning signs every patient leaves with when no condition-specific list
/// applies.
const DEFAULT_WARNING_SIGNS: [&str; 8] = [
    "Fever >101.5\u{b0}F",
    "Severe headache",
    "New weakness or numbness",
    "Seizure activity",
    "Wound drainage or redness",
    "Persistent nausea/vomiting",
    "Vision changes",
    "Confusion",
];

/// Accumulates recommendations across every detected condition and
/// procedure, then applies the universal defaults.
pub fn generate(conditions: &[Condition], procedures: &[Procedure]) -> RecommendationSet {
    let mut set = RecommendationSet::default();

    for condition in conditions {
        match condition.name {
            "Subarachnoid Hemorrhage" => {
                set.medications.push(MedicationRec {
                    drug: "Nimodipine",
                    dose: "60mg PO q4h",
                    duration: Some("21 days"),
                    start: None,
                    reason: Some("Vasospasm prevention"),
                    evidence: "Class I, Level A",
                    nnt: Some("13"),
                });
                set.medications.push(MedicationRec {
                    drug: "Levetiracetam",
                    dose: "1000mg BID",
                    duration: Some("7 days"),
                    start: None,
                    reason: Some("Seizure prophylaxis"),
                    evidence: "Class IIb, Level B",
                    nnt: None,
                });
                set.monitoring.push(MonitoringRec {
                    test: "Transcranial Doppler",
                    frequency: "Daily",
                    duration: "Days 3-14",
                    reason: "Vasospasm detection",
                    threshold: "MCA velocity >120 cm/s",
                });
                set.warning_signs.extend([
                    "Severe headache (\"thunderclap\")",
                    "Sudden change in mental status",
                    "New focal neurological deficits",
                    "Seizures",
                ]);
            }
            "Traumatic Brain Injury" => {
                set.medications.push(MedicationRec {
                    drug: "Levetiracetam",
                    dose: "1000mg BID",
                    duration: Some("7 days"),
                    start: None,
                    reason: Some("Seizure prophylaxis in severe TBI"),
                    evidence: "Level A recommendation",
                    nnt: None,
                });
                set.activity.push(ActivityRec {
                    context: "Traumatic Brain Injury",
                    instructions: vec![
                        "Cognitive rest x 48 hours",
                        "Step-wise return to activities",
                        "Avoid contact sports x 3-6 months",
                    ],
                });
            }
            _ => {}
        }
    }

    for procedure in procedures {
        if procedure.name.contains("Craniotomy") {
            set.activity.push(ActivityRec {
                context: "Craniotomy",
                instructions: vec![
                    "No heavy lifting >10 lbs x 4 weeks",
                    "No driving x 2 weeks minimum",
                    "Return to work: minimum 4-6 weeks",
                ],
            });
            set.wound_care.push(WoundCareRec {
                instruction: "Keep incision clean and dry",
                showering: "May shower after 48 hours",
                watch_for: "Monitor for redness, drainage, fever",
            });
        }
        if procedure.name.contains("Spinal Fusion") {
            set.activity.push(ActivityRec {
                context: "Spinal Fusion",
                instructions: vec![
                    "No BLT x 6 weeks",
                    "PT to start at 2 weeks post-op",
                    "Driving when off narcotics",
                    "Wear lumbar brace when out of bed",
                ],
            });
            set.medications.push(MedicationRec {
                drug: "Enoxaparin",
                dose: "40mg SQ daily",
                duration: Some("Until ambulatory"),
                start: Some("POD#1"),
                reason: None,
                evidence: "Strong recommendation",
                nnt: None,
            });
        }
    }

    if set.warning_signs.is_empty() {
        set.warning_signs.extend(DEFAULT_WARNING_SIGNS);
    }
    if !set.follow_up.iter().any(|f| f.specialty == "Neurosurgery") {
        set.follow_up.push(FollowUpRec {
            specialty: "Neurosurgery",
            timing: "2 weeks",
            reason: "Wound check, staple removal",
            tests: "None routine",
        });
    }

    set
}
