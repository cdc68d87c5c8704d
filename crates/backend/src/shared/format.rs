use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};

/// Formats a number with thousands separators (dots)
///
/// # Examples
/// ```
/// use backend::shared::format::format_number;
/// assert_eq!(format_number(1234567), "1.234.567");
/// assert_eq!(format_number(42), "42");
/// assert_eq!(format_number(0), "0");
/// ```
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// ISO-8601 timestamp in the display timezone, millisecond precision
pub fn display_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as an RFC 3339
/// date-time. Date-times are converted to the display timezone first so the
/// stored date is the local calendar day.
pub fn parse_visit_date(raw: &str, offset: FixedOffset) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&offset).date_naive())
        .map_err(|_| format!("'{}' is neither YYYY-MM-DD nor an RFC 3339 date-time", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1.000");
        assert_eq!(format_number(1234567), "1.234.567");
    }

    #[test]
    fn test_display_timestamp_uses_offset() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap();
        assert_eq!(display_timestamp(ts, wib()), "2026-03-02T03:30:00.000+07:00");
    }

    #[test]
    fn test_parse_visit_date_plain() {
        assert_eq!(
            parse_visit_date("2026-05-14", wib()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 14).unwrap()
        );
    }

    #[test]
    fn test_parse_visit_date_normalizes_datetime_to_local_day() {
        // 18:00 UTC is already the next day in UTC+7
        assert_eq!(
            parse_visit_date("2026-05-14T18:00:00Z", wib()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 15).unwrap()
        );
        assert_eq!(
            parse_visit_date("2026-05-14T08:00:00+07:00", wib()).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 14).unwrap()
        );
    }

    #[test]
    fn test_parse_visit_date_rejects_garbage() {
        assert!(parse_visit_date("14/05/2026", wib()).is_err());
        assert!(parse_visit_date("", wib()).is_err());
    }
}
