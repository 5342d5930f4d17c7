//! Pickup-day classification and weekly status aggregation.
//!
//! Special service is a property of the whole reported week: every weekday of a week whose
//! designated pickup day is a recycling or yard-waste date classifies as that type. Weekend
//! dates roll forward and report the following week.

use chrono::NaiveDate;

use crate::calendar::ServiceCalendar;
use crate::dates::{InvalidDateFormat, parse_civil_date, reported_week};
use crate::model::{DayClassification, PickupType, WeekStatus, WeekStatusKind};

/// Classify a civil date against the calendar.
///
/// Never yields [`PickupType::NoPickup`]; weekends report the upcoming week.
#[must_use]
pub fn classify_date(calendar: &ServiceCalendar, date: NaiveDate) -> PickupType {
    let week = reported_week(date);
    calendar
        .designated_day(&week)
        .map_or(PickupType::TrashOnly, |(_day, pickup_type)| pickup_type)
}

/// Classify a `YYYY-MM-DD` string.
///
/// # Errors
///
/// Returns [`InvalidDateFormat`] for malformed strings or impossible dates.
pub fn classify(
    calendar: &ServiceCalendar,
    input: &str,
) -> Result<DayClassification, InvalidDateFormat> {
    let date = parse_civil_date(input)?;
    Ok(DayClassification {
        date,
        pickup_type: classify_date(calendar, date),
    })
}

/// Summarise the reported week containing (or following, on weekends) `date`.
///
/// Weekdays are scanned Friday back to Monday; the first special classification decides the
/// status. The special day is the calendar's designated date for the week, falling back to the
/// scanned day.
#[must_use]
pub fn week_status_for(calendar: &ServiceCalendar, date: NaiveDate) -> WeekStatus {
    let week = reported_week(date);
    let mut any_pickup = false;

    for day in week.days().rev() {
        let pickup_type = classify_date(calendar, day);
        if pickup_type.is_special() {
            let special_day = calendar
                .designated_day(&week)
                .map_or(day, |(designated, _type)| designated);
            return WeekStatus {
                reported_week: week,
                week_status: WeekStatusKind::from(pickup_type),
                special_pickup_day_in_week: Some(special_day),
                special_pickup_type_on_date: Some(pickup_type),
            };
        }
        any_pickup |= pickup_type != PickupType::NoPickup;
    }

    WeekStatus {
        reported_week: week,
        week_status: if any_pickup {
            WeekStatusKind::NormalTrashWeek
        } else {
            WeekStatusKind::NoPickupWeek
        },
        special_pickup_day_in_week: None,
        special_pickup_type_on_date: None,
    }
}

/// Summarise the reported week for a `YYYY-MM-DD` string.
///
/// # Errors
///
/// Returns [`InvalidDateFormat`] for malformed strings or impossible dates.
pub fn week_status(
    calendar: &ServiceCalendar,
    input: &str,
) -> Result<WeekStatus, InvalidDateFormat> {
    parse_civil_date(input).map(|date| week_status_for(calendar, date))
}
