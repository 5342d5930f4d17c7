//! Designated recycling and yard-waste pickup dates.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::dates::parse_civil_date;
use crate::model::{PickupType, ReportedWeek};
use crate::ports::PortError;

const BUNDLED_VERSION: &str = "2025-2026";

const BUNDLED_RECYCLING: &[&str] = &[
    "2025-05-02", "2025-05-09", "2025-05-30",
    "2025-06-13", "2025-06-27",
    "2025-07-11", "2025-07-25",
    "2025-08-08", "2025-08-22",
    "2025-09-05", "2025-09-19",
    "2025-10-03", "2025-10-17", "2025-10-31",
    "2025-11-14", "2025-11-28",
    "2025-12-12", "2025-12-26",
    "2026-01-09", "2026-01-23",
    "2026-02-06", "2026-02-20",
    "2026-03-06", "2026-03-20",
    "2026-04-03", "2026-04-17",
];

// 2025-07-03 is a Thursday; the holiday week shifts service forward a day.
const BUNDLED_YARD_WASTE: &[&str] = &[
    "2025-05-16", "2025-05-23",
    "2025-06-06", "2025-06-20",
    "2025-07-03",
    "2025-07-18",
    "2025-08-01", "2025-08-15", "2025-08-29",
    "2025-09-12", "2025-09-26",
    "2025-10-10", "2025-10-24",
    "2025-11-07", "2025-11-21",
    "2026-04-10", "2026-04-24",
];

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable, versioned sets of designated pickup dates.
///
/// A date belongs to at most one set. A new schedule replaces the calendar wholesale.
pub struct ServiceCalendar {
    version: String,
    recycling: BTreeSet<NaiveDate>,
    yard_waste: BTreeSet<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarFile {
    version: String,
    recycling_dates: Vec<String>,
    yard_waste_dates: Vec<String>,
}

impl ServiceCalendar {
    /// Build a calendar from `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidDateFormat`] for a malformed date and
    /// [`PortError::InvalidCalendar`] when a date appears in both sets.
    pub fn new<S: AsRef<str>>(
        version: impl Into<String>,
        recycling_dates: &[S],
        yard_waste_dates: &[S],
    ) -> Result<Self, PortError> {
        let recycling = parse_set(recycling_dates)?;
        let yard_waste = parse_set(yard_waste_dates)?;

        if let Some(shared) = recycling.intersection(&yard_waste).next() {
            return Err(PortError::InvalidCalendar(format!(
                "{shared} is both a recycling and a yard waste date"
            )));
        }

        Ok(Self {
            version: version.into(),
            recycling,
            yard_waste,
        })
    }

    /// The schedule shipped with the crate.
    #[must_use]
    pub fn bundled() -> Self {
        let parse = |dates: &[&str]| {
            dates
                .iter()
                .filter_map(|raw| parse_civil_date(raw).ok())
                .collect::<BTreeSet<_>>()
        };
        Self {
            version: BUNDLED_VERSION.to_owned(),
            recycling: parse(BUNDLED_RECYCLING),
            yard_waste: parse(BUNDLED_YARD_WASTE),
        }
    }

    /// Parse a calendar document of the form
    /// `{ "version": .., "recyclingDates": [..], "yardWasteDates": [..] }`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidCalendar`] for malformed JSON, plus anything [`Self::new`] rejects.
    pub fn from_json(document: &str) -> Result<Self, PortError> {
        let file: CalendarFile = serde_json::from_str(document)
            .map_err(|err| PortError::InvalidCalendar(err.to_string()))?;
        Self::new(file.version, &file.recycling_dates, &file.yard_waste_dates)
    }

    /// Version label of this schedule.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Literal membership of a date in one of the sets.
    #[must_use]
    pub fn designated_type(&self, date: NaiveDate) -> Option<PickupType> {
        if self.recycling.contains(&date) {
            Some(PickupType::Recycling)
        } else if self.yard_waste.contains(&date) {
            Some(PickupType::YardWaste)
        } else {
            None
        }
    }

    /// The designated pickup day of a week, if the week has one.
    ///
    /// Friday is checked first, then the remaining weekdays backwards, so a holiday shift onto an
    /// earlier weekday is still found.
    #[must_use]
    pub fn designated_day(&self, week: &ReportedWeek) -> Option<(NaiveDate, PickupType)> {
        week.days()
            .rev()
            .find_map(|day| self.designated_type(day).map(|pickup_type| (day, pickup_type)))
    }

    /// Number of designated recycling dates.
    #[must_use]
    pub fn recycling_count(&self) -> usize {
        self.recycling.len()
    }

    /// Number of designated yard-waste dates.
    #[must_use]
    pub fn yard_waste_count(&self) -> usize {
        self.yard_waste.len()
    }
}

impl Default for ServiceCalendar {
    fn default() -> Self {
        Self::bundled()
    }
}

fn parse_set<S: AsRef<str>>(dates: &[S]) -> Result<BTreeSet<NaiveDate>, PortError> {
    dates
        .iter()
        .map(|raw| parse_civil_date(raw.as_ref()).map_err(PortError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::reported_week;

    fn date(input: &str) -> NaiveDate {
        parse_civil_date(input).expect("valid test date")
    }

    #[test]
    fn bundled_calendar_parses_every_entry() {
        let calendar = ServiceCalendar::bundled();
        assert_eq!(calendar.recycling_count(), BUNDLED_RECYCLING.len());
        assert_eq!(calendar.yard_waste_count(), BUNDLED_YARD_WASTE.len());
        assert_eq!(calendar.version(), "2025-2026");
    }

    #[test]
    fn bundled_sets_are_disjoint() {
        let rebuilt = ServiceCalendar::new(BUNDLED_VERSION, BUNDLED_RECYCLING, BUNDLED_YARD_WASTE);
        assert_eq!(rebuilt.ok(), Some(ServiceCalendar::bundled()));
    }

    #[test]
    fn rejects_overlapping_sets() {
        let result = ServiceCalendar::new("bad", &["2025-05-02"], &["2025-05-02"]);
        assert!(matches!(result, Err(PortError::InvalidCalendar(_))));
    }

    #[test]
    fn rejects_malformed_dates() {
        let result = ServiceCalendar::new("bad", &["2025-5-2"], &[]);
        assert!(matches!(result, Err(PortError::InvalidDateFormat(_))));
    }

    #[test]
    fn designated_day_prefers_friday_and_finds_thursday_shift() {
        let calendar = ServiceCalendar::bundled();
        assert_eq!(
            calendar.designated_day(&reported_week(date("2025-04-29"))),
            Some((date("2025-05-02"), PickupType::Recycling))
        );
        assert_eq!(
            calendar.designated_day(&reported_week(date("2025-07-01"))),
            Some((date("2025-07-03"), PickupType::YardWaste))
        );
        assert_eq!(calendar.designated_day(&reported_week(date("2025-04-22"))), None);
    }

    #[test]
    fn loads_calendar_from_json() {
        let calendar = ServiceCalendar::from_json(
            r#"{"version":"test","recyclingDates":["2030-01-04"],"yardWasteDates":["2030-01-11"]}"#,
        )
        .expect("valid calendar document");
        assert_eq!(calendar.version(), "test");
        assert_eq!(calendar.designated_type(date("2030-01-04")), Some(PickupType::Recycling));
        assert_eq!(calendar.designated_type(date("2030-01-11")), Some(PickupType::YardWaste));
        assert_eq!(calendar.designated_type(date("2030-01-18")), None);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            ServiceCalendar::from_json("{\"version\":1}"),
            Err(PortError::InvalidCalendar(_))
        ));
    }
}
