//! Clinical decision support for neurosurgical discharge summaries.
//!
//! Three pure layers over note text and the extracted record:
//!
//! - **Catalogue detection** — keyword-triggered recognition of the
//!   conditions and procedures the guideline tables know about, with ICD-10
//!   and CPT coding data attached
//! - **Risk scoring** — deterministic additive scorers for seizure, venous
//!   thromboembolism, readmission, and (after subarachnoid hemorrhage)
//!   vasospasm
//! - **Recommendations** — fixed evidence-based medication, monitoring,
//!   activity, wound-care, and warning-sign bundles per detection
//!
//! Everything here is synchronous and side-effect free; the orchestration
//! and persistence live in `summary-service`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod catalogue;
pub mod recommendations;
pub mod risk;

pub use catalogue::{detect_conditions, detect_procedures, Condition, Procedure, ProcedureKind, Severity};
pub use recommendations::{generate as generate_recommendations, RecommendationSet};
pub use risk::{
    assess, ReadmissionRisk, RiskAssessment, RiskCategory, SeizureRisk, VasospasmRisk, VteRisk,
};
