//! Civil date arithmetic in the service time zone.

use chrono::{
    DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::model::ReportedWeek;

/// Time zone every civil date is interpreted in unless configured otherwise.
pub const SERVICE_TIME_ZONE: Tz = chrono_tz::America::Los_Angeles;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Date must be in YYYY-MM-DD format: {input:?}")]
/// A date string that is malformed or names an impossible calendar day.
pub struct InvalidDateFormat {
    /// The rejected input.
    pub input: String,
}

impl InvalidDateFormat {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_owned(),
        }
    }
}

/// Parse a strict `YYYY-MM-DD` civil date.
///
/// Leading signs, missing zero padding and impossible days such as `2025-02-30` are rejected.
///
/// # Errors
///
/// Returns [`InvalidDateFormat`] when the input does not name a real calendar day.
pub fn parse_civil_date(input: &str) -> Result<NaiveDate, InvalidDateFormat> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        });
    if !well_formed {
        return Err(InvalidDateFormat::new(input));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_parse_err| InvalidDateFormat::new(input))
}

/// Format a civil date as `YYYY-MM-DD`.
#[must_use]
pub fn format_civil_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The civil date of `now` in `zone`.
#[must_use]
pub fn civil_date(now: DateTime<Utc>, zone: Tz) -> NaiveDate {
    now.with_timezone(&zone).date_naive()
}

/// Whether the date is Saturday or Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() > 5
}

/// Resolve the Monday..Friday week a date reports on.
///
/// Weekdays report their own week; Saturday and Sunday roll forward to the following week.
#[must_use]
pub fn reported_week(date: NaiveDate) -> ReportedWeek {
    let weekday = date.weekday();
    let start_date = if is_weekend(date) {
        date + Days::new(u64::from(8 - weekday.number_from_monday()))
    } else {
        date - Days::new(u64::from(weekday.num_days_from_monday()))
    };

    ReportedWeek {
        start_date,
        end_date: start_date + Days::new(4),
    }
}

/// Earliest date on or after `date` falling on `target`.
///
/// Inclusive: when `date` already falls on `target` the same date is returned.
#[must_use]
pub fn next_occurrence(date: NaiveDate, target: Weekday) -> NaiveDate {
    let current = date.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let ahead = (wanted + 7 - current) % 7;
    date + Days::new(u64::from(ahead))
}

/// Next occurrence of `target` relative to the civil date of `now` in `zone`.
#[must_use]
pub fn next_occurrence_at(now: DateTime<Utc>, zone: Tz, target: Weekday) -> NaiveDate {
    next_occurrence(civil_date(now, zone), target)
}

/// Map a weekday number (1 = Monday .. 5 = Friday) to a pickup weekday.
#[must_use]
pub fn pickup_weekday(number: u8) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        _ => None,
    }
}

/// The instant a local wall-clock time occurs on `date` in `zone`.
///
/// Ambiguous times (autumn fall-back) take the earlier occurrence; times inside a spring-forward
/// gap move one hour later.
#[must_use]
pub fn local_instant(zone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let local = date.and_time(time);
    let resolved = match zone.from_local_datetime(&local) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => Some(instant),
        LocalResult::None => zone
            .from_local_datetime(&(local + TimeDelta::hours(1)))
            .earliest(),
    };
    resolved.map(|instant| instant.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(input: &str) -> NaiveDate {
        parse_civil_date(input).expect("valid test date")
    }

    #[test]
    fn rejects_malformed_and_impossible_dates() {
        for input in [
            "invalid-date",
            "2025-13-01",
            "2025-02-30",
            "2025-1-1",
            "+2025-01-01",
            "2025/01/01",
            "",
            "2025-05-05T00:00",
        ] {
            assert!(parse_civil_date(input).is_err(), "{input} should be rejected");
        }
        assert_eq!(
            parse_civil_date("2024-02-29").map(format_civil_date),
            Ok("2024-02-29".to_owned())
        );
    }

    #[test]
    fn weekdays_report_their_own_week() {
        let week = reported_week(date("2025-05-06"));
        assert_eq!(week.start_date, date("2025-05-05"));
        assert_eq!(week.end_date, date("2025-05-09"));
        assert_eq!(reported_week(date("2025-05-05")), week);
        assert_eq!(reported_week(date("2025-05-09")), week);
    }

    #[test]
    fn weekends_roll_forward_to_next_week() {
        let saturday = reported_week(date("2025-05-10"));
        let sunday = reported_week(date("2025-05-11"));
        assert_eq!(saturday.start_date, date("2025-05-12"));
        assert_eq!(saturday.end_date, date("2025-05-16"));
        assert_eq!(saturday, sunday);
    }

    #[test]
    fn reported_week_crosses_year_boundary() {
        let week = reported_week(date("2025-12-27"));
        assert_eq!(week.start_date, date("2025-12-29"));
        assert_eq!(week.end_date, date("2026-01-02"));
    }

    #[test]
    fn next_occurrence_is_inclusive() {
        let monday = date("2025-06-02");
        assert_eq!(next_occurrence(monday, Weekday::Mon), monday);
        assert_eq!(next_occurrence(monday, Weekday::Fri), date("2025-06-06"));
        assert_eq!(next_occurrence(date("2025-06-07"), Weekday::Mon), date("2025-06-09"));
        assert_eq!(next_occurrence(date("2025-06-06"), Weekday::Thu), date("2025-06-12"));
    }

    #[test]
    fn next_occurrence_uses_service_zone_date() {
        // 2025-06-07 03:00 UTC is still Friday evening in Los Angeles.
        let now = Utc
            .with_ymd_and_hms(2025, 6, 7, 3, 0, 0)
            .single()
            .expect("valid instant");
        assert_eq!(civil_date(now, SERVICE_TIME_ZONE), date("2025-06-06"));
        assert_eq!(
            next_occurrence_at(now, SERVICE_TIME_ZONE, Weekday::Fri),
            date("2025-06-06")
        );
    }

    #[test]
    fn pickup_weekday_accepts_monday_through_friday() {
        assert_eq!(pickup_weekday(1), Some(Weekday::Mon));
        assert_eq!(pickup_weekday(5), Some(Weekday::Fri));
        assert_eq!(pickup_weekday(0), None);
        assert_eq!(pickup_weekday(6), None);
    }

    #[test]
    fn local_instant_tracks_daylight_saving() {
        let evening = NaiveTime::from_hms_opt(19, 0, 0).expect("valid time");
        let summer = local_instant(SERVICE_TIME_ZONE, date("2025-07-03"), evening);
        let winter = local_instant(SERVICE_TIME_ZONE, date("2025-12-11"), evening);
        assert_eq!(
            summer.map(|instant| instant.to_rfc3339()),
            Some("2025-07-04T02:00:00+00:00".to_owned())
        );
        assert_eq!(
            winter.map(|instant| instant.to_rfc3339()),
            Some("2025-12-12T03:00:00+00:00".to_owned())
        );
    }

    #[test]
    fn local_instant_moves_out_of_spring_gap() {
        let gap = NaiveTime::from_hms_opt(2, 30, 0).expect("valid time");
        let resolved = local_instant(SERVICE_TIME_ZONE, date("2025-03-09"), gap);
        // 03:30 PDT
        assert_eq!(
            resolved.map(|instant| instant.to_rfc3339()),
            Some("2025-03-09T10:30:00+00:00".to_owned())
        );
    }
}
