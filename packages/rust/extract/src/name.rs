//! Name strategies.
//!
//! 1. [`BilingualAdjacency`]: the Latin-script line printed right after a
//!    local-script line.
//! 2. [`CapitalizedPhrase`]: the first run of capitalized words that contains
//!    no label word.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::strategy::FieldStrategy;
use crate::text::{DocumentText, has_non_ascii, strip_non_ascii};

/// Label words that never appear in a person's name.
pub const NOISE_WORDS: &[&str] = &[
    "TO",
    "ENROLMENT",
    "DETAILS",
    "AADHAAR",
    "VID",
    "MALE",
    "FEMALE",
    "DIST",
    "STATE",
    "PIN",
    "CODE",
    "ADDRESS",
    "C/O",
    "MOBILE",
];

/// Care-of marker that introduces a guardian, not the holder.
const CARE_OF: &str = "c/o";

// ---------------------------------------------------------------------------
// Bilingual line adjacency
// ---------------------------------------------------------------------------

/// Name printed in both scripts: local-script line, then Latin-script line.
pub struct BilingualAdjacency;

impl FieldStrategy for BilingualAdjacency {
    fn find(&self, doc: &DocumentText) -> Option<String> {
        let lines = doc.lines();
        lines
            .iter()
            .zip(lines.iter().skip(1))
            .filter(|(line, _)| has_non_ascii(line))
            .map(|(_, next)| strip_non_ascii(next))
            .find(|candidate| is_name_line(candidate))
    }

    fn name(&self) -> &str {
        "bilingual-adjacency"
    }
}

fn is_name_line(candidate: &str) -> bool {
    candidate.split_whitespace().count() >= 2
        && !candidate.to_ascii_lowercase().starts_with(CARE_OF)
}

// ---------------------------------------------------------------------------
// Capitalized phrase
// ---------------------------------------------------------------------------

/// One to four consecutive capitalized words.
static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+){0,3})\b").expect("phrase regex")
});

/// First capitalized phrase none of whose words is a label.
pub struct CapitalizedPhrase {
    noise: HashSet<String>,
}

impl CapitalizedPhrase {
    /// Use the built-in noise words plus `extra` (compared upper-cased).
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Self {
        let noise = NOISE_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.as_ref().trim().to_uppercase()))
            .collect();
        Self { noise }
    }

    fn is_noise(&self, word: &str) -> bool {
        self.noise.contains(&word.to_uppercase())
    }
}

impl Default for CapitalizedPhrase {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}

impl FieldStrategy for CapitalizedPhrase {
    fn find(&self, doc: &DocumentText) -> Option<String> {
        PHRASE_RE
            .find_iter(doc.collapsed())
            .map(|m| m.as_str())
            .find(|phrase| !phrase.split_whitespace().any(|w| self.is_noise(w)))
            .map(|phrase| phrase.trim().to_string())
    }

    fn name(&self) -> &str {
        "capitalized-phrase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bilingual(text: &str) -> Option<String> {
        BilingualAdjacency.find(&DocumentText::new(text))
    }

    fn capitalized(text: &str) -> Option<String> {
        CapitalizedPhrase::default().find(&DocumentText::new(text))
    }

    #[test]
    fn first_qualifying_pair_wins() {
        let text = "இந்திய அரசு\nGovernment of India\nகார்த்திகேயன்\nV Karthikeyan\nDOB: 15/02/1978";
        // "Government of India" follows the first local-script line.
        assert_eq!(bilingual(text).as_deref(), Some("Government of India"));
    }

    #[test]
    fn residue_stripped_from_candidate() {
        let text = "கார்த்திகேயன்\nV Karthikeyan ஆண்\nMale";
        assert_eq!(bilingual(text).as_deref(), Some("V Karthikeyan"));
    }

    #[test]
    fn single_word_candidate_rejected_and_scan_continues() {
        let text = "ஆண்\nMale\nகார்த்திகேயன்\nV Karthikeyan";
        assert_eq!(bilingual(text).as_deref(), Some("V Karthikeyan"));
    }

    #[test]
    fn care_of_line_rejected() {
        let text = "முகவரி\nC/O: P Venkataraman";
        assert_eq!(bilingual(text), None);
        let text = "முகவரி\nc/o P Venkataraman";
        assert_eq!(bilingual(text), None);
    }

    #[test]
    fn ascii_only_text_has_no_bilingual_name() {
        assert_eq!(bilingual("To\nV Karthikeyan\nDOB: 01/01/2000"), None);
    }

    #[test]
    fn single_physical_line_still_yields_name() {
        let text = "இந்திய அரசு கார்த்திகேயன் Asha Verma DOB: 12/03/1990";
        assert_eq!(bilingual(text).as_deref(), Some("Asha Verma DOB: 12/03/1990"));
    }

    #[test]
    fn capitalized_phrase_skips_label_phrases() {
        let text = "Enrolment Details\n12/03/1990\nAsha Verma";
        assert_eq!(capitalized(text).as_deref(), Some("Asha Verma"));
    }

    #[test]
    fn label_word_swallows_adjacent_name() {
        // Collapsed text reads "To Asha Verma, C/O Ravi Verma"; the first
        // phrase contains TO, so the guardian's name is the first survivor.
        let text = "To\nAsha Verma, C/O Ravi Verma";
        assert_eq!(capitalized(text).as_deref(), Some("Ravi Verma"));
    }

    #[test]
    fn one_noise_word_discards_whole_phrase() {
        // "Male Asha Verma" is one phrase; MALE disqualifies all of it.
        assert_eq!(capitalized("Male Asha Verma"), None);
    }

    #[test]
    fn phrase_limited_to_four_words() {
        let found = capitalized("Alpha Beta Gamma Delta Epsilon");
        assert_eq!(found.as_deref(), Some("Alpha Beta Gamma Delta"));
    }

    #[test]
    fn extra_noise_words_are_case_insensitive() {
        let strategy = CapitalizedPhrase::new(&["government", "India"]);
        let doc = DocumentText::new("Government Of India\n12/03/1990 Asha Verma");
        // "Government Of India" is one phrase and contains a noise word.
        assert_eq!(strategy.find(&doc).as_deref(), Some("Asha Verma"));
    }
}
