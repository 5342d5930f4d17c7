//! High-level service facade over the service calendar.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::calendar::ServiceCalendar;
use crate::classify::{classify, classify_date, week_status, week_status_for};
use crate::dates::{InvalidDateFormat, SERVICE_TIME_ZONE, civil_date};
use crate::model::{DayClassification, PickupType, WeekStatus};
use crate::ports::{ClassificationPort, PortError};

#[derive(Debug, Clone)]
/// Public entry point for classification and weekly status queries.
///
/// Pure and cheap to clone; safe to share across threads.
pub struct CurbsideService {
    calendar: Arc<ServiceCalendar>,
    zone: Tz,
}

impl Default for CurbsideService {
    fn default() -> Self {
        Self::new(Arc::new(ServiceCalendar::bundled()), SERVICE_TIME_ZONE)
    }
}

impl CurbsideService {
    /// Create a service bound to a calendar and the zone its dates live in.
    #[must_use]
    pub fn new(calendar: Arc<ServiceCalendar>, zone: Tz) -> Self {
        Self { calendar, zone }
    }

    /// Calendar in use.
    #[must_use]
    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    /// Service time zone.
    #[must_use]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Today's civil date in the service zone.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        civil_date(now, self.zone)
    }

    /// Classify a `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateFormat`] for malformed or impossible dates.
    pub fn pickup_type(&self, input: &str) -> Result<DayClassification, InvalidDateFormat> {
        classify(&self.calendar, input)
    }

    /// Status of the reported week for a `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateFormat`] for malformed or impossible dates.
    pub fn week_status(&self, input: &str) -> Result<WeekStatus, InvalidDateFormat> {
        week_status(&self.calendar, input)
    }

    /// Status of the week reported for the current moment.
    #[must_use]
    pub fn current_week_status(&self, now: DateTime<Utc>) -> WeekStatus {
        week_status_for(&self.calendar, self.today(now))
    }
}

#[async_trait]
impl ClassificationPort for CurbsideService {
    async fn classify_date(&self, date: NaiveDate) -> Result<PickupType, PortError> {
        Ok(classify_date(&self.calendar, date))
    }
}
