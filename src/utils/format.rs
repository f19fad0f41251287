use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid regex"));

/// True when the string has at least one non-whitespace character
pub fn string_has_value(value: Option<&str>) -> bool {
    value.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Format a North American phone number as `(XXX) XXX-XXXX`.
///
/// Non-digits are stripped and a leading country code `1` is dropped. Anything
/// that does not leave exactly ten digits formats to an empty string, which
/// callers treat as "invalid".
pub fn format_phone_number(phone_number: &str) -> String {
    let digits = NON_DIGIT_RE.replace_all(phone_number.trim(), "");
    let digits = digits.strip_prefix('1').unwrap_or(&digits);

    if digits.len() != 10 {
        return String::new();
    }

    format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}

/// Unix seconds to `MM/DD`; `None` or an out-of-range value gives an empty string
pub fn format_short_date(unix_secs: Option<i64>) -> String {
    unix_secs
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|date| date.format("%m/%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_has_value() {
        assert!(string_has_value(Some("abc")));
        assert!(string_has_value(Some("  a ")));
        assert!(!string_has_value(Some("   ")));
        assert!(!string_has_value(Some("")));
        assert!(!string_has_value(None));
    }

    #[test]
    fn test_format_phone_number() {
        assert_eq!(format_phone_number("5551234567"), "(555) 123-4567");
        assert_eq!(format_phone_number(" +1 (555) 123-4567 "), "(555) 123-4567");
        assert_eq!(format_phone_number("555.123.4567"), "(555) 123-4567");
    }

    #[test]
    fn test_format_phone_number_rejects_bad_lengths() {
        assert_eq!(format_phone_number(""), "");
        assert_eq!(format_phone_number("1"), "");
        assert_eq!(format_phone_number("555123"), "");
        assert_eq!(format_phone_number("55512345678"), "");
        assert_eq!(format_phone_number("call me"), "");
    }

    #[test]
    fn test_format_short_date() {
        // 2024-03-05T12:00:00Z
        assert_eq!(format_short_date(Some(1_709_640_000)), "03/05");
        assert_eq!(format_short_date(None), "");
    }
}
