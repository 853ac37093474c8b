//! Parsing and formatting of user-supplied and stored timestamps.

use crate::error::{Error, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parse a timestamp given on the command line or returned by the cluster.
///
/// Accepts RFC 3339 (`2024-03-01T12:00:00Z`), a naive date-time which is
/// taken as UTC (`2024-03-01T12:00:00`), or a bare date at midnight UTC
/// (`2024-03-01`).
pub fn parse_timestamp(input: &str) -> Result<OffsetDateTime> {
    let input = input.trim();
    if let Ok(parsed) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(parsed);
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(input, naive) {
        return Ok(parsed.assume_utc());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(input, date_only) {
        return Ok(date.midnight().assume_utc());
    }
    Err(Error::InvalidDate(input.to_string()))
}

/// Convert epoch milliseconds (as reported by min/max aggregations) to a timestamp.
pub fn from_epoch_millis(millis: f64) -> Result<OffsetDateTime> {
    if !millis.is_finite() {
        return Err(Error::InvalidDate(format!("{millis}")));
    }
    let nanos = (millis as i128) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| Error::InvalidDate(format!("{millis}: {e}")))
}

/// Render an optional timestamp for console output.
pub fn display(ts: Option<OffsetDateTime>) -> String {
    match ts {
        Some(ts) => ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string()),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse_timestamp("2024-03-01T12:00:00Z").unwrap(),
            datetime!(2024-03-01 12:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-03-01T12:00:00.000+02:00").unwrap(),
            datetime!(2024-03-01 10:00 UTC)
        );
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        assert_eq!(
            parse_timestamp("2024-03-01T12:00:00").unwrap(),
            datetime!(2024-03-01 12:00 UTC)
        );
        assert_eq!(
            parse_timestamp(" 2024-03-01 ").unwrap(),
            datetime!(2024-03-01 0:00 UTC)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("last tuesday"),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_from_epoch_millis() {
        assert_eq!(
            from_epoch_millis(1_704_067_200_000.0).unwrap(),
            datetime!(2024-01-01 0:00 UTC)
        );
        assert!(from_epoch_millis(f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(display(None), "-");
        assert_eq!(
            display(Some(datetime!(2024-01-01 0:00 UTC))),
            "2024-01-01T00:00:00Z"
        );
    }
}
