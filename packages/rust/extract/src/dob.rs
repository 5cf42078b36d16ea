//! Date-of-birth strategies.
//!
//! Documents print several dates (issue date, "details as on"), so the
//! labelled search must run before the unconditional first-date fallback.

use std::sync::LazyLock;

use regex::Regex;

use crate::strategy::FieldStrategy;
use crate::text::DocumentText;

/// `DD/MM/YYYY` or `DD-MM-YYYY`.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{2}[/-][0-9]{2}[/-][0-9]{4}\b").expect("date regex"));

/// Upper-cased labels that announce a date of birth.
const DOB_LABELS: &[&str] = &["DOB", "DATE OF BIRTH"];

fn first_date(text: &str) -> Option<String> {
    DATE_RE.find(text).map(|m| m.as_str().to_string())
}

fn has_dob_label(line: &str) -> bool {
    let upper = line.to_uppercase();
    DOB_LABELS.iter().any(|label| upper.contains(label))
}

/// A date on a labelled line, or on the line right after it.
pub struct LabelledDate;

impl FieldStrategy for LabelledDate {
    fn find(&self, doc: &DocumentText) -> Option<String> {
        let lines = doc.lines();
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| has_dob_label(line))
            .find_map(|(i, line)| {
                first_date(line).or_else(|| lines.get(i + 1).and_then(|next| first_date(next)))
            })
    }

    fn name(&self) -> &str {
        "labelled-date"
    }
}

/// The first date anywhere in the document.
pub struct FirstDate;

impl FieldStrategy for FirstDate {
    fn find(&self, doc: &DocumentText) -> Option<String> {
        first_date(doc.raw())
    }

    fn name(&self) -> &str {
        "first-date"
    }
}
