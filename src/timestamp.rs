//! # Timestamp Conversion
//!
//! Chromium-family browsers store times as microseconds since
//! 1601-01-01T00:00:00 UTC (the WebKit epoch). Conversion never fails: zero,
//! negative or unrepresentable values become `None`, and the latter two are
//! reported as diagnostics.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::report::{Diagnostic, Reporter};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const WEBKIT_UNIX_OFFSET_SECONDS: i64 = 11_644_473_600;

const MICROS_PER_SECOND: i64 = 1_000_000;

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Zone in which converted calendar values are expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    #[default]
    Utc,
    Local,
}

/// Convert a WebKit timestamp to a calendar value.
pub fn webkit_to_datetime(
    raw: Option<i64>,
    zone: TimeZoneMode,
    reporter: &dyn Reporter,
) -> Option<NaiveDateTime> {
    let microseconds = raw.filter(|value| *value != 0)?;
    if microseconds < 0 {
        reporter.report(Diagnostic::NegativeTimestamp { raw: microseconds });
        return None;
    }

    let secs = microseconds / MICROS_PER_SECOND - WEBKIT_UNIX_OFFSET_SECONDS;
    let micros = (microseconds % MICROS_PER_SECOND) as u32;
    let Some(utc) = DateTime::<Utc>::from_timestamp(secs, micros * 1000) else {
        reporter.report(Diagnostic::UnrepresentableTimestamp { raw: microseconds });
        return None;
    };

    Some(match zone {
        TimeZoneMode::Utc => utc.naive_utc(),
        TimeZoneMode::Local => utc.with_timezone(&Local).naive_local(),
    })
}

/// Inverse of [`webkit_to_datetime`] for values expressed in UTC.
pub fn datetime_to_webkit(value: NaiveDateTime) -> i64 {
    let utc = value.and_utc();
    (utc.timestamp() + WEBKIT_UNIX_OFFSET_SECONDS) * MICROS_PER_SECOND
        + i64::from(utc.timestamp_subsec_micros())
}

/// Render for display; absent values render as an empty string.
pub fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingReporter;
    use chrono::{NaiveDate, Timelike};

    fn convert(raw: i64, reporter: &CollectingReporter) -> Option<NaiveDateTime> {
        webkit_to_datetime(Some(raw), TimeZoneMode::Utc, reporter)
    }

    #[test]
    fn zero_and_missing_are_no_value() {
        let reporter = CollectingReporter::new();
        assert_eq!(convert(0, &reporter), None);
        assert_eq!(webkit_to_datetime(None, TimeZoneMode::Utc, &reporter), None);
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn negative_is_no_value_with_notice() {
        let reporter = CollectingReporter::new();
        assert_eq!(convert(-1, &reporter), None);
        assert_eq!(
            reporter.events(),
            vec![Diagnostic::NegativeTimestamp { raw: -1 }]
        );
    }

    #[test]
    fn out_of_range_degrades_to_no_value() {
        let reporter = CollectingReporter::new();
        assert_eq!(convert(i64::MAX, &reporter), None);
        assert_eq!(
            reporter.events(),
            vec![Diagnostic::UnrepresentableTimestamp { raw: i64::MAX }]
        );
    }

    #[test]
    fn known_value_is_pinned() {
        let reporter = CollectingReporter::new();
        let dt = convert(13_380_105_538_768_906, &reporter).expect("datetime");
        let expected = NaiveDate::from_ymd_opt(2024, 12, 31)
            .and_then(|d| d.and_hms_micro_opt(7, 58, 58, 768_906))
            .expect("date");
        assert_eq!(dt, expected);
        assert_eq!(format_datetime(Some(dt)), "2024-12-31 07:58:58");
    }

    #[test]
    fn local_mode_shifts_by_host_offset() {
        use chrono::{Duration, TimeZone};

        let reporter = CollectingReporter::new();
        let raw = Some(13_380_105_538_768_906);
        let utc = webkit_to_datetime(raw, TimeZoneMode::Utc, &reporter).expect("utc");
        let local = webkit_to_datetime(raw, TimeZoneMode::Local, &reporter).expect("local");

        let offset = Local.offset_from_utc_datetime(&utc);
        assert_eq!(
            local - utc,
            Duration::seconds(i64::from(offset.local_minus_utc()))
        );
        assert_eq!(local.nanosecond(), utc.nanosecond());
    }

    #[test]
    fn unix_epoch_boundary() {
        let reporter = CollectingReporter::new();
        let dt = convert(WEBKIT_UNIX_OFFSET_SECONDS * MICROS_PER_SECOND, &reporter)
            .expect("datetime");
        assert_eq!(format_datetime(Some(dt)), "1970-01-01 00:00:00");
    }

    #[test]
    fn round_trips_microseconds() {
        let reporter = CollectingReporter::new();
        for raw in [
            1i64,
            999_999,
            1_000_000,
            11_644_473_599_999_999,
            13_303_449_600_000_000,
            13_380_105_538_768_906,
            100_000_000_000_000_000,
        ] {
            let dt = convert(raw, &reporter).expect("datetime");
            assert_eq!(datetime_to_webkit(dt), raw, "raw={raw}");
            assert_eq!(i64::from(dt.nanosecond() / 1000), raw % MICROS_PER_SECOND);
        }
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn no_value_formats_empty() {
        assert_eq!(format_datetime(None), "");
    }

    #[test]
    fn display_drops_subseconds() {
        let dt = NaiveDate::from_ymd_opt(2022, 7, 28)
            .and_then(|d| d.and_hms_micro_opt(2, 40, 0, 999_999))
            .expect("date");
        assert_eq!(format_datetime(Some(dt)), "2022-07-28 02:40:00");
    }
}
