//! Domain data structures for pickup days, reported weeks, and reminders.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Collection service that applies on a given day.
pub enum PickupType {
    /// Recycling and regular trash.
    Recycling,
    /// Yard waste and regular trash.
    YardWaste,
    /// Regular trash only.
    TrashOnly,
    /// No service. Kept for wire compatibility; the classifier does not produce it.
    NoPickup,
}

impl PickupType {
    /// Whether this type marks a week as special (recycling or yard waste).
    #[must_use]
    pub fn is_special(self) -> bool {
        matches!(self, PickupType::Recycling | PickupType::YardWaste)
    }
}

impl fmt::Display for PickupType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            PickupType::Recycling => "recycling",
            PickupType::YardWaste => "yard_waste",
            PickupType::TrashOnly => "trash_only",
            PickupType::NoPickup => "no_pickup",
        };
        write!(formatter, "{tag}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Classification of a single civil date. Computed on demand, never stored.
pub struct DayClassification {
    /// The date that was asked about.
    pub date: NaiveDate,
    /// Service applying to that date.
    pub pickup_type: PickupType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Aggregate status of a reported week.
pub enum WeekStatusKind {
    /// The week's pickup day includes recycling.
    RecyclingWeek,
    /// The week's pickup day includes yard waste.
    YardWasteWeek,
    /// Regular trash only.
    NormalTrashWeek,
    /// No weekday yields any pickup. Only reachable as a safety net.
    NoPickupWeek,
}

impl From<PickupType> for WeekStatusKind {
    fn from(pickup_type: PickupType) -> Self {
        match pickup_type {
            PickupType::Recycling => WeekStatusKind::RecyclingWeek,
            PickupType::YardWaste => WeekStatusKind::YardWasteWeek,
            PickupType::TrashOnly => WeekStatusKind::NormalTrashWeek,
            PickupType::NoPickup => WeekStatusKind::NoPickupWeek,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Monday through Friday window a status response describes.
pub struct ReportedWeek {
    /// Monday (inclusive).
    pub start_date: NaiveDate,
    /// Friday (inclusive).
    pub end_date: NaiveDate,
}

impl ReportedWeek {
    /// Iterate the five weekdays of the week, Monday first.
    pub fn days(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + use<> {
        let start = self.start_date;
        (0..5_u64).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The one day of a reported week carrying recycling or yard waste service.
pub struct SpecialDay {
    /// Date of the special pickup.
    pub date: NaiveDate,
    /// Either [`PickupType::Recycling`] or [`PickupType::YardWaste`].
    pub pickup_type: PickupType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Summary of a reported week, shaped the way the query surface returns it.
pub struct WeekStatus {
    /// Week the status describes.
    pub reported_week: ReportedWeek,
    /// Aggregate status.
    pub week_status: WeekStatusKind,
    /// Date of the special pickup, if any.
    pub special_pickup_day_in_week: Option<NaiveDate>,
    /// Type of the special pickup, if any.
    pub special_pickup_type_on_date: Option<PickupType>,
}

impl WeekStatus {
    /// The special day as a single value, when both halves are present.
    #[must_use]
    pub fn special_day(&self) -> Option<SpecialDay> {
        match (self.special_pickup_day_in_week, self.special_pickup_type_on_date) {
            (Some(date), Some(pickup_type)) => Some(SpecialDay { date, pickup_type }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Body text chosen for a reminder.
pub enum MessageVariant {
    /// Recycling week.
    Recycling,
    /// Yard waste week.
    YardWaste,
    /// Trash only.
    TrashOnly,
    /// No pickup.
    NoPickup,
    /// Classification could not be fetched.
    Generic,
}

impl From<PickupType> for MessageVariant {
    fn from(pickup_type: PickupType) -> Self {
        match pickup_type {
            PickupType::Recycling => MessageVariant::Recycling,
            PickupType::YardWaste => MessageVariant::YardWaste,
            PickupType::TrashOnly => MessageVariant::TrashOnly,
            PickupType::NoPickup => MessageVariant::NoPickup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Title and body shown by the notification backend.
pub struct ReminderContent {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One-shot request submitted to the notification backend.
pub struct ReminderRequest {
    /// Stable identifier; resubmitting the same identifier replaces the request.
    pub identifier: String,
    /// Instant the reminder fires.
    pub fire_at: DateTime<Utc>,
    /// Displayed content.
    pub content: ReminderContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A reminder written by the scheduler during a full reschedule.
pub struct ScheduledReminder {
    /// Identifier derived from `week_offset`.
    pub identifier: String,
    /// Instant the reminder fires.
    pub fire_at: DateTime<Utc>,
    /// Weeks ahead of the reschedule's reference date.
    pub week_offset: u32,
    /// Pickup date the reminder is about.
    pub pickup_date: NaiveDate,
    /// Selected body text.
    pub variant: MessageVariant,
}
