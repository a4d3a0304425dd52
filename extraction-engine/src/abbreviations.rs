//! Clinical abbreviation expansion.
//!
//! Rewrites raw note text by substituting whole-word, case-insensitive
//! occurrences of known clinical abbreviations with their full terms. The
//! static dictionary is applied first, then any abbreviation patterns learned
//! from repeated user corrections (training keys of the form
//! `abbr:<token>:<expansion>` seen more than twice).

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Static neurosurgery abbreviation dictionary: `(abbreviation, full term)`.
/// Order matters only for readability; entries are independent whole-word
/// substitutions.
const ABBREVIATIONS: &[(&str, &str)] = &[
    // Hemorrhage & vascular
    ("sah", "subarachnoid hemorrhage"),
    ("sdh", "subdural hematoma"),
    ("edh", "epidural hematoma"),
    ("ich", "intracerebral hemorrhage"),
    ("iph", "intraparenchymal hemorrhage"),
    ("ivh", "intraventricular hemorrhage"),
    ("avm", "arteriovenous malformation"),
    ("avf", "arteriovenous fistula"),
    ("davf", "dural arteriovenous fistula"),
    ("ccf", "carotid-cavernous fistula"),
    ("ica", "internal carotid artery"),
    ("eca", "external carotid artery"),
    ("mca", "middle cerebral artery"),
    ("aca", "anterior cerebral artery"),
    ("pca", "posterior cerebral artery"),
    ("pcom", "posterior communicating artery"),
    ("acom", "anterior communicating artery"),
    ("cea", "carotid endarterectomy"),
    // Spine
    ("acdf", "anterior cervical discectomy and fusion"),
    ("pcdf", "posterior cervical decompression and fusion"),
    ("plif", "posterior lumbar interbody fusion"),
    ("tlif", "transforaminal lumbar interbody fusion"),
    ("alif", "anterior lumbar interbody fusion"),
    ("xlif", "extreme lateral interbody fusion"),
    ("llif", "lateral lumbar interbody fusion"),
    ("ddd", "degenerative disc disease"),
    ("hnp", "herniated nucleus pulposus"),
    ("lss", "lumbar spinal stenosis"),
    ("css", "cervical spinal stenosis"),
    // Tumors
    ("gbm", "glioblastoma multiforme"),
    ("lgg", "low-grade glioma"),
    ("hgg", "high-grade glioma"),
    ("gtr", "gross total resection"),
    ("str", "subtotal resection"),
    ("srs", "stereotactic radiosurgery"),
    ("wbrt", "whole brain radiation therapy"),
    // Procedures
    ("crani", "craniotomy"),
    ("evd", "external ventricular drain"),
    ("vps", "ventriculoperitoneal shunt"),
    ("dbs", "deep brain stimulation"),
    ("mvd", "microvascular decompression"),
    ("scs", "spinal cord stimulator"),
    // Clinical
    ("gcs", "Glasgow Coma Scale"),
    ("icp", "intracranial pressure"),
    ("cpp", "cerebral perfusion pressure"),
    ("tbi", "traumatic brain injury"),
    ("nph", "normal pressure hydrocephalus"),
    // Medications
    ("vanco", "vancomycin"),
    ("ancef", "cefazolin"),
    ("keppra", "levetiracetam"),
    ("dilantin", "phenytoin"),
    ("dex", "dexamethasone"),
    // Monitoring
    ("tcd", "transcranial Doppler"),
    ("eeg", "electroencephalography"),
    ("emg", "electromyography"),
];

lazy_static! {
    /// Pre-compiled whole-word matchers for the static dictionary.
    static ref DICTIONARY_MATCHERS: Vec<(Regex, &'static str)> = ABBREVIATIONS
        .iter()
        .filter_map(|(abbr, expansion)| {
            whole_word_matcher(abbr).map(|re| (re, *expansion))
        })
        .collect();

    static ref DICTIONARY_LOOKUP: HashMap<&'static str, &'static str> =
        ABBREVIATIONS.iter().copied().collect();
}

/// Occurrence threshold at which a learned `abbr:` pattern starts applying.
const LEARNED_PATTERN_THRESHOLD: u32 = 2;

fn whole_word_matcher(token: &str) -> Option<Regex> {
    if token.trim().is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(token))).ok()
}

/// Whether `word` (lowercased) is a key in the static dictionary. Used by the
/// entity recognizer for its dictionary confidence boost.
pub fn is_known_abbreviation(word: &str) -> bool {
    DICTIONARY_LOOKUP.contains_key(word.to_lowercase().as_str())
}

/// Expand every whole-word, case-insensitive abbreviation occurrence.
///
/// `learned_patterns` is the training-state pattern counter; keys of the form
/// `abbr:<token>:<expansion>` with a count above 2 are applied after the
/// static dictionary, so a learned substitution can rewrite on top of
/// already-expanded text. Replacements are full medical phrases, so
/// re-running on expanded text is a no-op in practice (best effort, not a
/// proven fixpoint).
pub fn expand_abbreviations(text: &str, learned_patterns: &HashMap<String, u32>) -> String {
    let mut expanded = text.to_string();

    for (matcher, expansion) in DICTIONARY_MATCHERS.iter() {
        expanded = matcher.replace_all(&expanded, *expansion).into_owned();
    }

    // Sorted for deterministic application order.
    let mut learned: Vec<(&String, &u32)> = learned_patterns
        .iter()
        .filter(|(key, count)| key.starts_with("abbr:") && **count > LEARNED_PATTERN_THRESHOLD)
        .collect();
    learned.sort_by(|a, b| a.0.cmp(b.0));

    for (key, _) in learned {
        // Key layout is `abbr:<token>:<expansion>`; anything past a third
        // colon is ignored rather than absorbed into the expansion.
        let mut parts = key.split(':');
        let _tag = parts.next();
        let (Some(token), Some(expansion)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Some(matcher) = whole_word_matcher(token) {
            expanded = matcher.replace_all(&expanded, expansion).into_owned();
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_learned() -> HashMap<String, u32> {
        HashMap::new()
    }

    #[test]
    fn expands_whole_word_case_insensitive() {
        let out = expand_abbreviations("Pt with SAH and sdh on imaging", &no_learned());
        assert_eq!(
            out,
            "Pt with subarachnoid hemorrhage and subdural hematoma on imaging"
        );
    }

    #[test]
    fn does_not_match_inside_longer_words() {
        let out = expand_abbreviations("traveled across the Sahara desert", &no_learned());
        assert_eq!(out, "traveled across the Sahara desert");
    }

    #[test]
    fn expansion_is_stable_on_expanded_text() {
        let once = expand_abbreviations("s/p crani for GBM, started keppra", &no_learned());
        let twice = expand_abbreviations(&once, &no_learned());
        assert_eq!(once, twice);
    }

    #[test]
    fn learned_pattern_applies_only_above_threshold() {
        let mut learned = HashMap::new();
        learned.insert("abbr:ms:mental status".to_string(), 2);
        let out = expand_abbreviations("MS unchanged overnight", &learned);
        assert_eq!(out, "MS unchanged overnight");

        learned.insert("abbr:ms:mental status".to_string(), 3);
        let out = expand_abbreviations("MS unchanged overnight", &learned);
        assert_eq!(out, "mental status unchanged overnight");
    }

    #[test]
    fn learned_patterns_apply_after_dictionary() {
        let mut learned = HashMap::new();
        learned.insert("abbr:ha:headache".to_string(), 5);
        let out = expand_abbreviations("Worst HA of life, concern for SAH", &learned);
        assert_eq!(
            out,
            "Worst headache of life, concern for subarachnoid hemorrhage"
        );
    }

    #[test]
    fn dictionary_lookup_matches_entries() {
        assert!(is_known_abbreviation("SAH"));
        assert!(is_known_abbreviation("keppra"));
        assert!(!is_known_abbreviation("aspirin"));
    }
}
