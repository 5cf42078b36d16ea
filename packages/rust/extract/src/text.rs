//! Text preparation shared by all extraction strategies.
//!
//! Each document is prepared once into a [`DocumentText`]: the raw text, its
//! logical lines, and a whitespace-collapsed single-line form.

/// A document prepared for field extraction.
#[derive(Debug, Clone)]
pub struct DocumentText {
    raw: String,
    lines: Vec<String>,
    collapsed: String,
}

impl DocumentText {
    /// Prepare raw document text.
    ///
    /// Lines are the non-empty trimmed physical lines. When the text has at
    /// most one physical line, it is split at local-script → Latin-script
    /// boundaries instead.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut lines = non_empty_lines(&raw);
        if lines.len() <= 1 {
            lines = split_at_script_boundary(&raw);
        }
        let collapsed = collapse_whitespace(&raw);
        Self {
            raw,
            lines,
            collapsed,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The text with every whitespace run replaced by a single space.
    pub fn collapsed(&self) -> &str {
        &self.collapsed
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Split at whitespace runs that sit between a non-ASCII character and an
/// ASCII letter.
pub(crate) fn split_at_script_boundary(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() && prev.is_some_and(|p| !p.is_ascii()) {
            let run_start = idx;
            while chars.peek().is_some_and(|(_, n)| n.is_whitespace()) {
                chars.next();
            }
            if let Some(&(next_idx, next)) = chars.peek() {
                if next.is_ascii_alphabetic() {
                    pieces.push(&text[piece_start..run_start]);
                    piece_start = next_idx;
                }
            }
            prev = Some(' ');
            continue;
        }
        prev = Some(c);
    }
    pieces.push(&text[piece_start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Replace every whitespace run with one space and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop every non-ASCII character and trim.
pub(crate) fn strip_non_ascii(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn has_non_ascii(text: &str) -> bool {
    !text.is_ascii()
}

/// The slice of `text` covering up to `before` characters ahead of byte
/// offset `at` and up to `after` characters from it.
pub(crate) fn char_window(text: &str, at: usize, before: usize, after: usize) -> &str {
    let start = text[..at]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map_or(at, |(i, _)| i);
    let end = text[at..]
        .char_indices()
        .nth(after)
        .map_or(text.len(), |(i, _)| at + i);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_text_keeps_physical_lines() {
        let doc = DocumentText::new("  first \n\n second\n");
        assert_eq!(doc.lines(), ["first", "second"]);
    }

    #[test]
    fn single_line_splits_at_script_boundary() {
        let doc = DocumentText::new("இந்திய அரசு Government of India கார்த்திகேயன் V Karthikeyan");
        assert_eq!(
            doc.lines(),
            [
                "இந்திய அரசு",
                "Government of India கார்த்திகேயன்",
                "V Karthikeyan"
            ]
        );
    }

    #[test]
    fn ascii_single_line_stays_whole() {
        let doc = DocumentText::new("DOB: 01/01/2000 Male");
        assert_eq!(doc.lines(), ["DOB: 01/01/2000 Male"]);
    }

    #[test]
    fn boundary_needs_latin_letter_after_gap() {
        let parts = split_at_script_boundary("பிறந்த 01/01/2000");
        assert_eq!(parts, ["பிறந்த 01/01/2000"]);
    }

    #[test]
    fn collapse_joins_lines() {
        assert_eq!(collapse_whitespace(" a\n\t b  c "), "a b c");
    }

    #[test]
    fn strip_non_ascii_keeps_latin() {
        assert_eq!(strip_non_ascii(" Asha Verma ஆஷா "), "Asha Verma");
    }

    #[test]
    fn window_counts_characters_not_bytes() {
        let text = "ஆஆஆ1234";
        let at = text.find('1').expect("digit");
        assert_eq!(char_window(text, at, 2, 2), "ஆஆ12");
        assert_eq!(char_window(text, at, 10, 10), text);
    }
}
