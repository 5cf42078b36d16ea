//! Age in completed years from a `DD/MM/YYYY` date of birth.

use chrono::{Datelike, NaiveDate};
use ekyc_shared::{EkycError, Result};

/// Strict `DD/MM/YYYY`, calendar-checked.
fn parse_ddmmyyyy(text: &str) -> std::result::Result<NaiveDate, &'static str> {
    let parts: Vec<&str> = text.trim().split('/').collect();
    let well_formed = parts.len() == 3
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[2].len() == 4
        && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err("expected DD/MM/YYYY");
    }

    // Digits only, so the parses cannot fail.
    let day: u32 = parts[0].parse().unwrap_or_default();
    let month: u32 = parts[1].parse().unwrap_or_default();
    let year: i32 = parts[2].parse().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month, day).ok_or("not a calendar date")
}

/// Parse a date of birth. Fails with `DOB_PARSE_ERROR`.
pub fn parse_dob(dob: &str) -> Result<NaiveDate> {
    parse_ddmmyyyy(dob).map_err(|msg| EkycError::dob_parse(dob, msg))
}

/// Parse any other `DD/MM/YYYY` date, such as a reference date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    parse_ddmmyyyy(text)
        .map_err(|msg| EkycError::validation(format!("invalid date {text:?}: {msg}")))
}

/// Completed years between `dob` and `today`.
///
/// The year difference is reduced by one while this year's birthday is
/// still ahead, so a person is 18 on their 18th birthday. A date of birth
/// after `today` yields a negative age.
pub fn age_as_of(dob: &str, today: NaiveDate) -> Result<i32> {
    let born = parse_dob(dob)?;
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_shared::StatusCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_after_birthday() {
        assert_eq!(age_as_of("15/02/1978", date(2025, 6, 19)).unwrap(), 47);
    }

    #[test]
    fn age_before_birthday() {
        assert_eq!(age_as_of("20/06/1978", date(2025, 6, 19)).unwrap(), 46);
    }

    #[test]
    fn eighteenth_birthday_today_is_adult() {
        assert_eq!(age_as_of("19/06/2007", date(2025, 6, 19)).unwrap(), 18);
        assert_eq!(age_as_of("20/06/2007", date(2025, 6, 19)).unwrap(), 17);
    }

    #[test]
    fn leap_day_birthday() {
        assert_eq!(age_as_of("29/02/2008", date(2026, 2, 28)).unwrap(), 17);
        assert_eq!(age_as_of("29/02/2008", date(2026, 3, 1)).unwrap(), 18);
    }

    #[test]
    fn malformed_dates_rejected() {
        for bad in ["15-02-1978", "1978/02/15", "5/2/1978", "31/02/2000", "", "ab/cd/efgh"] {
            let err = age_as_of(bad, date(2025, 6, 19)).unwrap_err();
            assert_eq!(err.code(), Some(StatusCode::DobParseError), "{bad}");
        }
    }

    #[test]
    fn future_dob_is_negative_age() {
        assert_eq!(age_as_of("20/06/2025", date(2025, 6, 19)).unwrap(), -1);
        assert_eq!(age_as_of("01/01/2030", date(2025, 6, 19)).unwrap(), -5);
    }

    #[test]
    fn reference_date_errors_are_not_dob_errors() {
        assert_eq!(parse_date("19/06/2025").unwrap(), date(2025, 6, 19));
        let err = parse_date("2025-06-19").unwrap_err();
        assert!(matches!(err, EkycError::Validation { .. }));
        assert!(!err.to_string().contains("date of birth"));
    }
}
