use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Milliseconds since the epoch for an event start (`dateTime` or bare `date`).
///
/// Bare dates count from UTC midnight; anything unparseable sorts as 0.
pub fn start_millis(start: Option<&str>) -> i64 {
    let Some(start) = start else {
        return 0;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(start) {
        return dt.timestamp_millis();
    }

    NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// `timeMin` for an event listing reaching `days` back from `now`
pub fn lookback_start(now: DateTime<Utc>, days: i64) -> String {
    (now - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_millis() {
        assert_eq!(start_millis(Some("1970-01-01T00:00:01Z")), 1000);
        assert_eq!(start_millis(Some("1970-01-01T09:00:01+09:00")), 1000);
        assert_eq!(start_millis(Some("1970-01-02")), 86_400_000);
        assert_eq!(start_millis(Some("not a date")), 0);
        assert_eq!(start_millis(None), 0);
    }

    #[test]
    fn test_lookback_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(lookback_start(now, 365), "2023-03-02T12:00:00.000Z");
    }
}
