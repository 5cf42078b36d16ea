//! Identity-number strategy.
//!
//! The 16-digit virtual ID is printed in the same `DDDD DDDD ...` grouping,
//! so its first twelve digits match the identity-number pattern. Candidates
//! close to a `VID` marker are skipped.

use std::sync::LazyLock;

use regex::Regex;

use crate::strategy::FieldStrategy;
use crate::text::{DocumentText, char_window};

/// Twelve digits, grouped 4-4-4 with single spaces or ungrouped.
static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]{4} [0-9]{4} [0-9]{4}\b|\b[0-9]{12}\b").expect("id regex")
});

const VID_MARKER: &str = "VID";

/// First twelve-digit number not near a `VID` marker.
pub struct GroupedDigits {
    vid_window: usize,
}

impl GroupedDigits {
    /// `vid_window` is the number of characters searched on each side of a
    /// candidate's start.
    pub fn new(vid_window: usize) -> Self {
        Self { vid_window }
    }
}

impl Default for GroupedDigits {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FieldStrategy for GroupedDigits {
    fn find(&self, doc: &DocumentText) -> Option<String> {
        let text = doc.raw();
        ID_RE
            .find_iter(text)
            .find(|m| {
                let window = char_window(text, m.start(), self.vid_window, self.vid_window);
                let near_vid = window.to_uppercase().contains(VID_MARKER);
                if near_vid {
                    tracing::debug!(offset = m.start(), "skipping candidate near VID marker");
                }
                !near_vid
            })
            .map(|m| m.as_str().replace(' ', ""))
    }

    fn name(&self) -> &str {
        "grouped-digits"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(text: &str) -> Option<String> {
        GroupedDigits::default().find(&DocumentText::new(text))
    }

    #[test]
    fn grouped_number_returned_without_spaces() {
        assert_eq!(find("Your number: 7369 6026 7850").as_deref(), Some("736960267850"));
    }

    #[test]
    fn ungrouped_number_accepted() {
        assert_eq!(find("ID 736960267850 issued").as_deref(), Some("736960267850"));
    }

    #[test]
    fn virtual_id_is_never_returned() {
        assert_eq!(find("VID: 9146 3922 9584 6765"), None);
    }

    #[test]
    fn number_after_virtual_id_is_found() {
        let text = "VID: 9146 3922 9584 6765\n\
                    Please keep this letter safe and share it only when required.\n\
                    7369 6026 7850";
        assert_eq!(find(text).as_deref(), Some("736960267850"));
    }

    #[test]
    fn marker_is_case_insensitive() {
        assert_eq!(find("your vid is 9146 3922 9584"), None);
    }

    #[test]
    fn marker_outside_window_is_ignored() {
        let padding = " ".repeat(40);
        let text = format!("VID{padding}7369 6026 7850");
        assert_eq!(find(&text).as_deref(), Some("736960267850"));
    }

    #[test]
    fn longer_digit_runs_do_not_match() {
        assert_eq!(find("account 12345678901234"), None);
    }

    #[test]
    fn custom_window_width() {
        let text = format!("VID{}7369 6026 7850", " ".repeat(40));
        let strategy = GroupedDigits::new(50);
        assert_eq!(strategy.find(&DocumentText::new(text)), None);
    }
}
