//! Unwrapping of document text handed over by upstream converters.
//!
//! Converters sometimes pass their whole result object instead of the text:
//! JSON (`{"status": "SUCCESS", "text": "..."}`) or a single-quoted literal
//! (`{'status': 'SUCCESS', 'text': '...'}`).

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static QUOTED_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\{.*['"]text['"]\s*:\s*'((?:[^'\\]|\\.)*)'.*\}$"#).expect("quoted text regex")
});

/// Return the document text, unwrapping a converter result object if present.
pub fn unwrap_document_text(input: &str) -> Cow<'_, str> {
    let trimmed = input.trim();
    if !trimmed.starts_with('{') {
        return Cow::Borrowed(input);
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        if let Some(serde_json::Value::String(text)) = map.get("text") {
            return Cow::Owned(text.clone());
        }
    }

    if let Some(caps) = QUOTED_TEXT_RE.captures(trimmed) {
        return Cow::Owned(unescape_literal(&caps[1]));
    }

    Cow::Borrowed(input)
}

fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = "DOB: 01/01/2000";
        assert!(matches!(unwrap_document_text(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn json_object_unwrapped() {
        let input = r#"{"status": "SUCCESS", "text": "Asha Verma\nDOB: 12/03/1990"}"#;
        assert_eq!(unwrap_document_text(input), "Asha Verma\nDOB: 12/03/1990");
    }

    #[test]
    fn single_quoted_literal_unwrapped() {
        let input = r"{'status': 'SUCCESS', 'text': 'Asha\'s letter\nDOB: 12/03/1990'}";
        assert_eq!(unwrap_document_text(input), "Asha's letter\nDOB: 12/03/1990");
    }

    #[test]
    fn object_without_text_left_alone() {
        let input = r#"{"status": "ERR"}"#;
        assert_eq!(unwrap_document_text(input), input);
    }
}
