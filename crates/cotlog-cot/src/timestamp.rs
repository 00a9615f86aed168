//! Sanitizing and parsing CoT time attributes.
//!
//! Logged timestamps are frequently damaged (stray characters, unpadded
//! fields, fractional seconds). They are normalized to
//! `YYYY-MM-DDTHH:MM:SSZ` before parsing, and all arithmetic happens at
//! whole-second precision.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Output format for rewritten time attributes.
pub const COT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const BARE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Attributes rewritten by a time shift.
pub const TIME_ATTRIBUTES: [&str; 3] = ["time", "start", "stale"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid time format: {0}")]
pub struct TimestampError(pub String);

/// Drops fractional seconds, strips everything outside `[0-9T:\-Z]` and
/// re-pads the hour, minute and second fields to two digits.
pub fn sanitize_time(raw: &str) -> String {
    let whole_seconds = raw.split('.').next().unwrap_or("");
    let cleaned: String = whole_seconds
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, 'T' | ':' | '-' | 'Z'))
        .collect();

    let date_part = cleaned.get(..10).unwrap_or(&cleaned);
    let time_part = cleaned.get(11..).unwrap_or("").replace('Z', "");
    let mut fields = time_part.split(':');

    let hours = pad_field(fields.next());
    let minutes = pad_field(fields.next());
    let seconds = pad_field(fields.next());

    format!("{}T{}:{}:{}Z", date_part, hours, minutes, seconds)
}

fn pad_field(field: Option<&str>) -> String {
    let field = field.unwrap_or("");
    let padded = format!("{:0>2}", field);
    padded.chars().take(2).collect()
}

/// Parses a timestamp in `...Z` or bare form.
pub fn parse_cot_time(value: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(value, COT_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, BARE_TIME_FORMAT))
        .map_err(|_| TimestampError(value.to_string()))
}

/// Sanitizes then parses a logged time attribute.
pub fn parse_logged_time(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    parse_cot_time(&sanitize_time(raw)).map_err(|_| TimestampError(raw.to_string()))
}

/// Parses a user-supplied target time.
///
/// A trailing `Z` selects the Zulu form, anything else must be bare;
/// no sanitizing is applied to user input.
pub fn parse_target_time(value: &str) -> Result<NaiveDateTime, TimestampError> {
    let value = value.trim();
    let format = if value.ends_with('Z') {
        COT_TIME_FORMAT
    } else {
        BARE_TIME_FORMAT
    };
    NaiveDateTime::parse_from_str(value, format).map_err(|_| TimestampError(value.to_string()))
}

pub fn format_cot_time(time: &NaiveDateTime) -> String {
    time.format(COT_TIME_FORMAT).to_string()
}

/// Time value used in dedup keys: fractional seconds and zone suffix
/// removed, otherwise compared verbatim.
pub fn truncate_to_seconds(raw: &str) -> &str {
    let whole_seconds = raw.split('.').next().unwrap_or("");
    whole_seconds.strip_suffix('Z').unwrap_or(whole_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_sanitize_clean_value() {
        assert_eq!(sanitize_time("2024-01-15T10:30:00Z"), "2024-01-15T10:30:00Z");
        assert_eq!(sanitize_time("2024-01-15T10:30:00.123Z"), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_sanitize_repairs_damage() {
        assert_eq!(sanitize_time("2024-01-15T1:3:7Z"), "2024-01-15T01:03:07Z");
        assert_eq!(sanitize_time(" 2024-01-15T10:30:0x0Z "), "2024-01-15T10:30:00Z");
        assert_eq!(sanitize_time("2024-01-15T10"), "2024-01-15T10:00:00Z");
        assert_eq!(sanitize_time("2024-01-15"), "2024-01-15T00:00:00Z");
        assert_eq!(sanitize_time("2024-01-15T101:30:00Z"), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_parse_cot_time() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_cot_time("2024-01-15T10:30:00Z").unwrap(), expected);
        assert_eq!(parse_cot_time("2024-01-15T10:30:00").unwrap(), expected);
        assert!(parse_cot_time("15/01/2024 10:30").is_err());
        assert_eq!(parse_logged_time("2024-01-15T10:30:00.999Z").unwrap(), expected);
    }

    #[test]
    fn test_parse_target_time() {
        assert!(parse_target_time("2024-09-16T17:13:48Z").is_ok());
        assert!(parse_target_time("2024-09-16T17:13:48").is_ok());
        assert!(parse_target_time("2024-09-16 17:13:48").is_err());
        assert!(parse_target_time("yesterday").is_err());
        assert!(parse_target_time("").is_err());
    }

    #[test]
    fn test_format_cot_time() {
        let time = parse_cot_time("2024-01-02T03:04:05").unwrap();
        assert_eq!(format_cot_time(&time), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_truncate_to_seconds() {
        assert_eq!(truncate_to_seconds("2024-01-01T00:00:00Z"), "2024-01-01T00:00:00");
        assert_eq!(truncate_to_seconds("2024-01-01T00:00:00.532Z"), "2024-01-01T00:00:00");
        assert_eq!(truncate_to_seconds("garbage"), "garbage");
    }
}
