//! Reminder preferences read from the externally owned settings store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use tracing::warn;

use crate::dates::pickup_weekday;
use crate::ports::{PortError, PreferencesStore};

/// Weekday the user's pickup happens on, `1` (Monday) to `5` (Friday).
pub const KEY_SELECTED_PICKUP_DAY: &str = "selectedPickupDay";
/// Whether reminders are enabled, `true` or `false`.
pub const KEY_NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
/// Reminder timing, see [`ReminderTiming`].
pub const KEY_NOTIFICATION_TIMING: &str = "notificationPreference";
/// Local time of an evening-before reminder, `HH:MM`.
pub const KEY_NOTIFICATION_TIME: &str = "notificationTime";
/// Instant of the last successful full reschedule, RFC 3339.
pub const KEY_LAST_SCHEDULED_AT: &str = "lastNotificationScheduleDate";

const EVENING_HOUR: u32 = 19;
const MORNING_HOUR: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// When a reminder fires relative to the pickup day.
pub enum ReminderTiming {
    /// No reminders.
    None,
    /// The evening before pickup at the configured time.
    #[default]
    EveningBefore,
    /// 07:00 on the pickup day.
    MorningOf,
}

impl ReminderTiming {
    /// Stored representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderTiming::None => "none",
            ReminderTiming::EveningBefore => "evening_before",
            ReminderTiming::MorningOf => "morning_of",
        }
    }
}

impl fmt::Display for ReminderTiming {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ReminderTiming {
    type Err = PortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "none" => Ok(ReminderTiming::None),
            "evening_before" => Ok(ReminderTiming::EveningBefore),
            "morning_of" => Ok(ReminderTiming::MorningOf),
            other => Err(invalid(KEY_NOTIFICATION_TIMING, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Snapshot of the user's reminder settings.
pub struct ReminderPreferences {
    /// Pickup weekday, Monday to Friday.
    pub selected_weekday: Weekday,
    /// Master switch for reminders.
    pub notifications_enabled: bool,
    /// When reminders fire.
    pub timing: ReminderTiming,
    /// Local time of evening-before reminders.
    pub time_of_day: NaiveTime,
}

impl Default for ReminderPreferences {
    fn default() -> Self {
        Self {
            selected_weekday: Weekday::Fri,
            notifications_enabled: false,
            timing: ReminderTiming::EveningBefore,
            time_of_day: evening_default(),
        }
    }
}

impl ReminderPreferences {
    /// Read preferences, applying defaults for absent or unparsable values.
    #[must_use]
    pub fn load(store: &dyn PreferencesStore) -> Self {
        let defaults = Self::default();
        Self {
            selected_weekday: read(store, KEY_SELECTED_PICKUP_DAY, parse_weekday)
                .unwrap_or(defaults.selected_weekday),
            notifications_enabled: read(store, KEY_NOTIFICATIONS_ENABLED, parse_bool)
                .unwrap_or(defaults.notifications_enabled),
            timing: read(store, KEY_NOTIFICATION_TIMING, str::parse)
                .unwrap_or(defaults.timing),
            time_of_day: read(store, KEY_NOTIFICATION_TIME, parse_time_of_day)
                .unwrap_or(defaults.time_of_day),
        }
    }

    /// Write every field back to the store.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] reported by the store.
    pub fn save(&self, store: &dyn PreferencesStore) -> Result<(), PortError> {
        store.set(
            KEY_SELECTED_PICKUP_DAY,
            self.selected_weekday.number_from_monday().to_string(),
        )?;
        store.set(KEY_NOTIFICATIONS_ENABLED, self.notifications_enabled.to_string())?;
        store.set(KEY_NOTIFICATION_TIMING, self.timing.as_str().to_owned())?;
        store.set(KEY_NOTIFICATION_TIME, self.time_of_day.format("%H:%M").to_string())
    }

    /// Whether a full reschedule should write reminders at all.
    #[must_use]
    pub fn wants_reminders(&self) -> bool {
        self.notifications_enabled && self.timing != ReminderTiming::None
    }

    /// Local wall-clock time reminders fire at for the configured timing.
    #[must_use]
    pub fn fire_time(&self) -> NaiveTime {
        match self.timing {
            ReminderTiming::MorningOf => morning_default(),
            ReminderTiming::EveningBefore | ReminderTiming::None => self.time_of_day,
        }
    }
}

/// Instant of the last successful full reschedule, if one was recorded.
#[must_use]
pub fn last_scheduled_at(store: &dyn PreferencesStore) -> Option<DateTime<Utc>> {
    read(store, KEY_LAST_SCHEDULED_AT, |raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|err| invalid(KEY_LAST_SCHEDULED_AT, &err.to_string()))
    })
}

/// Record the instant of a successful full reschedule.
///
/// # Errors
///
/// Returns the [`PortError`] reported by the store.
pub fn record_scheduled_at(
    store: &dyn PreferencesStore,
    now: DateTime<Utc>,
) -> Result<(), PortError> {
    store.set(KEY_LAST_SCHEDULED_AT, now.to_rfc3339())
}

/// Parse `1`..`5` into a pickup weekday.
///
/// # Errors
///
/// Returns [`PortError::InvalidPreference`] outside Monday..Friday.
pub fn parse_weekday(raw: &str) -> Result<Weekday, PortError> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .and_then(pickup_weekday)
        .ok_or_else(|| invalid(KEY_SELECTED_PICKUP_DAY, raw))
}

/// Parse an `HH:MM` local time.
///
/// # Errors
///
/// Returns [`PortError::InvalidPreference`] for anything else.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, PortError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_parse_err| invalid(KEY_NOTIFICATION_TIME, raw))
}

fn parse_bool(raw: &str) -> Result<bool, PortError> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(invalid(KEY_NOTIFICATIONS_ENABLED, other)),
    }
}

fn read<T>(
    store: &dyn PreferencesStore,
    key: &str,
    parse: impl FnOnce(&str) -> Result<T, PortError>,
) -> Option<T> {
    let raw = store.get(key)?;
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, %err, "Ignoring unreadable preference, using default");
            None
        }
    }
}

fn invalid(key: &str, raw: &str) -> PortError {
    PortError::InvalidPreference {
        key: key.to_owned(),
        reason: format!("unexpected value {raw:?}"),
    }
}

fn evening_default() -> NaiveTime {
    NaiveTime::from_hms_opt(EVENING_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn morning_default() -> NaiveTime {
    NaiveTime::from_hms_opt(MORNING_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPreferences;

    #[test]
    fn empty_store_yields_defaults() {
        let prefs = ReminderPreferences::load(&MemoryPreferences::default());
        assert_eq!(prefs, ReminderPreferences::default());
        assert_eq!(prefs.selected_weekday, Weekday::Fri);
        assert!(!prefs.notifications_enabled);
        assert_eq!(prefs.timing, ReminderTiming::EveningBefore);
        assert_eq!(prefs.fire_time(), NaiveTime::from_hms_opt(19, 0, 0).expect("valid time"));
        assert!(!prefs.wants_reminders());
    }

    #[test]
    fn reads_stored_values() {
        let store = MemoryPreferences::from_pairs([
            (KEY_SELECTED_PICKUP_DAY, "2"),
            (KEY_NOTIFICATIONS_ENABLED, "true"),
            (KEY_NOTIFICATION_TIMING, "morning_of"),
            (KEY_NOTIFICATION_TIME, "20:30"),
        ]);
        let prefs = ReminderPreferences::load(&store);
        assert_eq!(prefs.selected_weekday, Weekday::Tue);
        assert!(prefs.wants_reminders());
        assert_eq!(prefs.timing, ReminderTiming::MorningOf);
        assert_eq!(prefs.time_of_day, NaiveTime::from_hms_opt(20, 30, 0).expect("valid time"));
        assert_eq!(prefs.fire_time(), NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"));
    }

    #[test]
    fn unreadable_values_fall_back_to_defaults() {
        let store = MemoryPreferences::from_pairs([
            (KEY_SELECTED_PICKUP_DAY, "6"),
            (KEY_NOTIFICATIONS_ENABLED, "maybe"),
            (KEY_NOTIFICATION_TIMING, "at_noon"),
            (KEY_NOTIFICATION_TIME, "7pm"),
        ]);
        assert_eq!(ReminderPreferences::load(&store), ReminderPreferences::default());
    }

    #[test]
    fn timing_none_disables_reminders() {
        let store = MemoryPreferences::from_pairs([
            (KEY_NOTIFICATIONS_ENABLED, "true"),
            (KEY_NOTIFICATION_TIMING, "none"),
        ]);
        assert!(!ReminderPreferences::load(&store).wants_reminders());
    }

    #[test]
    fn save_round_trips_through_the_store() {
        let store = MemoryPreferences::default();
        let prefs = ReminderPreferences {
            selected_weekday: Weekday::Wed,
            notifications_enabled: true,
            timing: ReminderTiming::MorningOf,
            time_of_day: NaiveTime::from_hms_opt(18, 15, 0).expect("valid time"),
        };
        prefs.save(&store).expect("memory store accepts writes");
        assert_eq!(store.get(KEY_SELECTED_PICKUP_DAY).as_deref(), Some("3"));
        assert_eq!(ReminderPreferences::load(&store), prefs);
    }

    #[test]
    fn last_scheduled_at_is_recorded() {
        let store = MemoryPreferences::default();
        assert_eq!(last_scheduled_at(&store), None);
        let now = DateTime::parse_from_rfc3339("2025-06-02T17:00:00Z")
            .expect("valid instant")
            .with_timezone(&Utc);
        record_scheduled_at(&store, now).expect("memory store accepts writes");
        assert_eq!(last_scheduled_at(&store), Some(now));
    }
}
