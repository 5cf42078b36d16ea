//! Flat text form of an [`OnboardingDecision`].
//!
//! ```text
//! ACTION|name:<v>,dob:<v>,idNumber:<v>,age:<n>[,phone:<v>]
//! ```
//!
//! Values are percent-escaped for the delimiter, quote and newline
//! characters, so a decoded token always equals the encoded decision even
//! after a channel strips quotes and line breaks.

use ekyc_shared::{Action, EkycError, OnboardingDecision, Result};

const ESCAPED: &[char] = &['%', '|', ',', ':', '"', '\'', '\r', '\n'];

/// Serialize a decision to its token.
pub fn encode(decision: &OnboardingDecision) -> String {
    let mut token = format!(
        "{}|name:{},dob:{},idNumber:{},age:{}",
        decision.action,
        escape(&decision.name),
        escape(&decision.dob),
        escape(&decision.id_number),
        decision.age
    );
    if let Some(phone) = &decision.phone {
        token.push_str(",phone:");
        token.push_str(&escape(phone));
    }
    token
}

/// Parse a token back into a decision.
///
/// Quote characters and line breaks are stripped first. The action is the
/// text before the first `|`; pairs are split on `,` and then on the first
/// `:`. `aadhaar` is accepted for `idNumber`; unknown keys are ignored.
pub fn decode(token: &str) -> Result<OnboardingDecision> {
    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\r' | '\n'))
        .collect();
    let cleaned = cleaned.trim();

    let Some((action, pairs)) = cleaned.split_once('|') else {
        return Err(EkycError::dispatch("token has no action separator"));
    };
    let action: Action = action
        .trim()
        .to_uppercase()
        .parse()
        .map_err(EkycError::dispatch)?;

    let mut name = None;
    let mut dob = None;
    let mut id_number = None;
    let mut age = None;
    let mut phone = None;

    for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once(':') else {
            return Err(EkycError::dispatch(format!("malformed pair {pair:?}")));
        };
        let value = unescape(value.trim());
        match key.trim() {
            "name" => name = Some(value),
            "dob" => dob = Some(value),
            "idNumber" | "aadhaar" => id_number = Some(value),
            "age" => age = Some(value),
            "phone" => phone = Some(value),
            _ => {}
        }
    }

    let missing = |key: &str| EkycError::dispatch(format!("token is missing {key:?}"));
    let age = age.ok_or_else(|| missing("age"))?;
    let age: i32 = age
        .parse()
        .map_err(|_| EkycError::dispatch(format!("age {age:?} is not an integer")))?;

    Ok(OnboardingDecision {
        action,
        name: name.ok_or_else(|| missing("name"))?,
        dob: dob.ok_or_else(|| missing("dob"))?,
        id_number: id_number.ok_or_else(|| missing("idNumber"))?,
        age,
        phone,
    })
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if ESCAPED.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape`]. A `%` not followed by the code of an escaped
/// character is kept as is.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail.get(1..3).and_then(escaped_char) {
            Some(c) => {
                out.push(c);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escaped_char(hex: &str) -> Option<char> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let c = char::from(u8::from_str_radix(hex, 16).ok()?);
    ESCAPED.contains(&c).then_some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_shared::StatusCode;

    fn decision(action: Action, name: &str) -> OnboardingDecision {
        OnboardingDecision {
            action,
            name: name.into(),
            dob: "01/01/2010".into(),
            id_number: "123412341234".into(),
            age: 15,
            phone: None,
        }
    }

    #[test]
    fn encodes_flat_token() {
        assert_eq!(
            encode(&decision(Action::HumanLoopRequired, "A B")),
            "HUMAN_LOOP_REQUIRED|name:A B,dob:01/01/2010,idNumber:123412341234,age:15"
        );
    }

    #[test]
    fn delimiters_in_values_survive() {
        let mut d = decision(Action::InsertRequired, "D'Souza, Maria: \"Jr\" | 100%");
        d.phone = Some("+91 98408\n21235".into());
        let decoded = decode(&encode(&d)).unwrap();
        assert_eq!(decoded, d);
    }

    #[test]
    fn quoted_and_wrapped_token_is_cleaned() {
        let token = "'human_loop_required|name:A B,\ndob:01/01/2010,idNumber:123412341234,age:15'\n";
        let d = decode(token).unwrap();
        assert_eq!(d.action, Action::HumanLoopRequired);
        assert_eq!(d.name, "A B");
        assert_eq!(d.age, 15);
    }

    #[test]
    fn unknown_percent_codes_pass_through() {
        let d = decode("INSERT_REQUIRED|name:100%41 %zz 5%,dob:01/01/1990,idNumber:123412341234,age:35")
            .unwrap();
        assert_eq!(d.name, "100%41 %zz 5%");
        let d = decode("INSERT_REQUIRED|name:a%2cb%7C%25,dob:01/01/1990,idNumber:123412341234,age:35")
            .unwrap();
        assert_eq!(d.name, "a,b|%");
    }

    #[test]
    fn negative_age_decodes() {
        let d = decode("HUMAN_LOOP_REQUIRED|name:A B,dob:20/06/2025,idNumber:123412341234,age:-1")
            .unwrap();
        assert_eq!(d.action, Action::HumanLoopRequired);
        assert_eq!(d.age, -1);
        assert_eq!(decode(&encode(&d)).unwrap(), d);
    }

    #[test]
    fn legacy_id_key_accepted() {
        let d = decode("INSERT_REQUIRED|name:A B,dob:01/01/1990,aadhaar:123412341234,age:35")
            .unwrap();
        assert_eq!(d.id_number, "123412341234");
    }

    #[test]
    fn malformed_tokens_are_dispatcher_errors() {
        for token in [
            "garbage-no-pipe",
            "|name:A B,dob:01/01/2010,idNumber:123412341234,age:15",
            "ONBOARD|name:A B,dob:01/01/2010,idNumber:123412341234,age:15",
            "INSERT_REQUIRED|name:A B,dob:01/01/2010,age:15",
            "INSERT_REQUIRED|name:A B,dob:01/01/2010,idNumber:123412341234,age:fifteen",
            "INSERT_REQUIRED|name:A B,dob:01/01/2010,idNumber:123412341234,age:15,oops",
        ] {
            let err = decode(token).unwrap_err();
            assert_eq!(err.code(), Some(StatusCode::DispatcherError), "{token}");
        }
    }
}
