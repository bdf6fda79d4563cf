//! Release date normalization
//!
//! Tag dates come as `YYYY`, `YYYY-MM` or `YYYY-MM-DD`. Missing month/day
//! default to the first. Anything else is unusable and yields `None`.

use chrono::NaiveDate;
use tracing::warn;

/// Parse a tag date into a calendar date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let parsed = parse_parts(raw.trim());
    if parsed.is_none() {
        warn!(value = raw, "Invalid date format, expected YYYY, YYYY-MM or YYYY-MM-DD");
    }
    parsed
}

fn parse_parts(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('-').collect();

    let expected_widths: &[usize] = match parts.len() {
        1 => &[4],
        2 => &[4, 2],
        3 => &[4, 2, 2],
        _ => return None,
    };

    let mut numbers = [1u32; 3];
    for (i, (part, width)) in parts.iter().zip(expected_widths).enumerate() {
        if part.len() != *width || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        numbers[i] = part.parse().ok()?;
    }

    NaiveDate::from_ymd_opt(numbers[0] as i32, numbers[1], numbers[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_accepted_shapes() {
        assert_eq!(parse_date("1999"), ymd(1999, 1, 1));
        assert_eq!(parse_date("1999-12"), ymd(1999, 12, 1));
        assert_eq!(parse_date("1999-12-03"), ymd(1999, 12, 3));
        assert_eq!(parse_date(" 1955 "), ymd(1955, 1, 1));
    }

    #[test]
    fn test_rejected_values() {
        assert_eq!(parse_date("1999-13-01"), None);
        assert_eq!(parse_date("12345"), None);
        assert_eq!(parse_date("Hello"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("1999-02-30"), None);
        assert_eq!(parse_date("1999-1-1"), None);
        assert_eq!(parse_date("1999-12-03-01"), None);
        assert_eq!(parse_date("+999"), None);
    }
}
