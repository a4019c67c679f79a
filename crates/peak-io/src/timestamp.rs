use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Day-first date format used by solution files.
pub const SOLUTION_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a timestamp as naive local time.
///
/// Accepts ISO-like forms with a space or `T` separator and optional
/// seconds; an RFC 3339 offset is dropped after parsing. A bare date reads
/// as midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_local());
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(Default::default()));
    }
    Err(anyhow!("unrecognised timestamp '{raw}'"))
}

pub fn parse_solution_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SOLUTION_DATE_FORMAT)
        .map_err(|err| anyhow!("invalid date '{raw}': {err}"))
}

/// Parse an optional numeric cell; blanks and `nan` read as `NaN`.
pub fn parse_value(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .map_err(|err| anyhow!("invalid number '{raw}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 28)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        for raw in [
            "2021-03-28 01:30:00",
            "2021-03-28 01:30",
            "2021-03-28T01:30:00",
            "2021-03-28T01:30:00+00:00",
            "2021-03-28 01:30:00+00:00",
        ] {
            assert_eq!(parse_timestamp(raw).unwrap(), expected, "{raw}");
        }
        assert!(parse_timestamp("28/03/2021").is_err());
    }

    #[test]
    fn parses_solution_dates_day_first() {
        let date = parse_solution_date("04/10/2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 10, 4).unwrap());
    }

    #[test]
    fn blank_values_are_nan() {
        assert!(parse_value("").unwrap().is_nan());
        assert!(parse_value("NaN").unwrap().is_nan());
        assert_eq!(parse_value(" 2.5 ").unwrap(), 2.5);
        assert!(parse_value("x").is_err());
    }
}
