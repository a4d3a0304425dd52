//! Heuristic segmentation of one pasted blob of mixed clinical notes.
//!
//! Splits on delimiter lines, then classifies each piece into exactly one
//! note type with a priority-ordered keyword test. Best effort by design:
//! misclassification is acceptable, but the result is always deterministic
//! and never empty (an unclassifiable blob lands in the admission bucket so
//! extraction always has something to work with).

use crate::record::NoteSections;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

#[allow(clippy::unwrap_used)]
lazy_static! {
    /// Delimiter lines: runs of 3+ `=`, `-`, `*`, or 2+ `#`.
    static ref SECTION_DELIMITER: Regex =
        Regex::new(r"(?m)^[ \t]*(?:={3,}|-{3,}|\*{3,}|#{2,})[ \t]*$").unwrap();
    static ref POST_OP_DAY: Regex =
        Regex::new(r"pod\s*#?\s*\d+|post-?op(?:erative)?\s+day").unwrap();
    static ref SPECIALTY_NOTE: Regex =
        Regex::new(r"(?:cardiology|neurology|medicine|icu|surgery)\s+note").unwrap();
    static ref OPERATIVE_LABELS: Regex =
        Regex::new(r"(?m)^\s*(?:indication|procedure|findings|complications)\s*:").unwrap();
}

/// Minimum size for the unclassified-section fallback into admission.
const FALLBACK_MIN_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteKind {
    Admission,
    Progress,
    Consultant,
    Procedure,
    Final,
}

/// Priority-ordered classification of one section. `admission_empty` gates
/// the oversized-section fallback.
fn classify(section: &str, admission_empty: bool) -> Option<NoteKind> {
    let lower = section.to_lowercase();

    if lower.contains("admission")
        || lower.contains("history and physical")
        || lower.contains("h&p")
        || lower.contains("chief complaint")
        || (lower.contains("patient") && lower.contains("admitted"))
    {
        return Some(NoteKind::Admission);
    }

    if lower.contains("progress note")
        || lower.contains("daily note")
        || lower.contains("soap note")
        || POST_OP_DAY.is_match(&lower)
    {
        return Some(NoteKind::Progress);
    }

    if lower.contains("consult")
        || lower.contains("recommendations from")
        || SPECIALTY_NOTE.is_match(&lower)
    {
        return Some(NoteKind::Consultant);
    }

    if lower.contains("operative note")
        || lower.contains("procedure note")
        || lower.contains("operation performed")
        || lower.contains("craniotomy")
        || lower.contains("laminectomy")
        || lower.contains("discectomy")
        || lower.contains("fusion")
        || OPERATIVE_LABELS.is_match(&lower)
    {
        return Some(NoteKind::Procedure);
    }

    if lower.contains("discharge")
        || lower.contains("final note")
        || lower.contains("disposition")
    {
        return Some(NoteKind::Final);
    }

    if admission_empty && section.len() > FALLBACK_MIN_CHARS {
        return Some(NoteKind::Admission);
    }

    None
}

fn append(bucket: &mut String, section: &str) {
    if !bucket.is_empty() {
        bucket.push_str("\n\n");
    }
    bucket.push_str(section);
}

/// Split a unified blob into typed note sections.
pub fn segment_notes(blob: &str) -> NoteSections {
    let mut sections = NoteSections::default();

    for piece in SECTION_DELIMITER.split(blob) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        match classify(piece, sections.admission.is_empty()) {
            Some(NoteKind::Admission) => append(&mut sections.admission, piece),
            Some(NoteKind::Progress) => append(&mut sections.progress, piece),
            Some(NoteKind::Consultant) => append(&mut sections.consultant, piece),
            Some(NoteKind::Procedure) => append(&mut sections.procedure, piece),
            Some(NoteKind::Final) => append(&mut sections.final_note, piece),
            None => debug!(length = piece.len(), "section left unclassified"),
        }
    }

    // Total-coverage guarantee: extraction always gets something.
    if sections.is_empty() && !blob.trim().is_empty() {
        sections.admission = blob.trim().to_string();
    }

    sections
}
