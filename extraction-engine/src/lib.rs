//! Clinical note text pipeline for discharge summary generation.
//!
//! Pure, synchronous text processing over free-text neurosurgery notes:
//!
//! - **Abbreviation expansion** — whole-word substitution from a static
//!   clinical dictionary plus patterns learned from user corrections
//! - **Note segmentation** — splitting one pasted blob of mixed notes into
//!   typed sections (admission, progress, consultant, procedure, discharge)
//! - **Pattern extraction** — ordered regex rules per field producing a
//!   [`ClinicalRecord`] with a per-field confidence map
//! - **Entity recognition** — per-type pattern sets with confidence scoring
//!   and case-insensitive deduplication
//! - **Training state** — a correction log and the counter-driven heuristic
//!   accuracy score that biases future confidence calculations
//!
//! Nothing in this crate performs I/O; persistence and the external
//! extraction provider live in `summary-service`.
//!
//! # Example
//!
//! ```rust
//! use extraction_engine::{segment_notes, PatternExtractor, TrainingState};
//!
//! let training = TrainingState::default();
//! let sections = segment_notes("ADMISSION NOTE\nPt: 58 yo M admitted with SAH");
//! let (record, confidence) = PatternExtractor::extract(&sections, &training);
//! assert_eq!(record.age, "58");
//! assert!(confidence.contains_key("age"));
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod abbreviations;
pub mod entities;
pub mod patterns;
pub mod record;
pub mod segmenter;
pub mod training;

pub use abbreviations::{expand_abbreviations, is_known_abbreviation};
pub use entities::{extract_entities, Entity, EntityKind};
pub use patterns::PatternExtractor;
pub use record::{ClinicalRecord, ConfidenceMap, FieldValue, NoteSections};
pub use segmenter::segment_notes;
pub use training::{AccuracyTrack, CorrectionEntry, TrainingState};
