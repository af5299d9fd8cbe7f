//! ISO-8601-like timestamp parsing for the `date` literal and field type.
//!
//! `spec.md` §6 requires accepting date-only, date+time, `Z`-suffixed, and
//! signed-offset forms, rejecting everything else with a fixed message.
//! Grounded on `original_source/dsl/util_test.go`'s `ParseDateLikeJS` tests.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses `input` per the accepted forms in `spec.md` §6:
/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, with `Z`, or with a signed
/// `±HHMM`/`±HH:MM` offset. Anything else is rejected.
pub fn parse_date_like_js(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Some(stripped) = input.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(format!("Not a parsable timestamp: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, offset_secs: i32) -> DateTime<Utc> {
        let naive = NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap();
        Utc.from_utc_datetime(&naive) - chrono::Duration::seconds(i64::from(offset_secs))
    }

    #[test]
    fn accepts_every_canonical_form() {
        assert_eq!(parse_date_like_js("2017-07-11").unwrap(), expect(2017, 7, 11, 0, 0, 0, 0));
        assert_eq!(
            parse_date_like_js("2017-07-11T00:14:56").unwrap(),
            expect(2017, 7, 11, 0, 14, 56, 0)
        );
        assert_eq!(
            parse_date_like_js("2017-07-11T00:14:56Z").unwrap(),
            expect(2017, 7, 11, 0, 14, 56, 0)
        );
        assert_eq!(
            parse_date_like_js("2017-07-11T00:14:56-0730").unwrap(),
            expect(2017, 7, 11, 0, 14, 56, -27_000)
        );
        assert_eq!(
            parse_date_like_js("2017-07-11T00:14:56-08:30").unwrap(),
            expect(2017, 7, 11, 0, 14, 56, -30_600)
        );
    }

    #[test]
    fn rejects_malformed_input() {
        let err = parse_date_like_js("2017-07-19T13:00:00Z-700").unwrap_err();
        assert_eq!(err, "Not a parsable timestamp: 2017-07-19T13:00:00Z-700");
    }
}
