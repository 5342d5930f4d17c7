//! Capacity-bounded reminder scheduler.
//!
//! A full reschedule clears every reminder this crate owns and regenerates one reminder per week
//! over a rolling window. Identifiers depend only on the week offset, so repeated runs replace
//! rather than duplicate. Classification lookups for the whole window run concurrently and are
//! joined before anything is written; writes then happen in pickup-date order.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::dates::{SERVICE_TIME_ZONE, civil_date, local_instant, next_occurrence};
use crate::model::{MessageVariant, ReminderContent, ReminderRequest, ScheduledReminder};
use crate::ports::{
    AuthorizationStatus, ClassificationPort, NotificationBackend, PortError, PreferencesStore,
};
use crate::prefs::{ReminderPreferences, ReminderTiming, last_scheduled_at, record_scheduled_at};

/// Platform ceiling on pending local notifications.
pub const PENDING_CAP: usize = 64;
/// Weeks covered by one full reschedule.
pub const MAX_WEEKS: u32 = 52;
/// Owned pending reminders below which a refresh is warranted.
pub const LOW_WATER_MARK: usize = 20;
/// Age of the last full reschedule after which a refresh is warranted.
pub const REFRESH_AFTER_DAYS: i64 = 30;
/// Prefix reserved for identifiers owned by the scheduler.
pub const REMINDER_ID_PREFIX: &str = "CurbsidePickupReminder_";
/// Title of every reminder.
pub const REMINDER_TITLE: &str = "Trash Day Reminder";

const _: () = assert!(MAX_WEEKS as usize <= PENDING_CAP);

/// Identifier of the reminder for a week offset.
#[must_use]
pub fn reminder_identifier(week_offset: u32) -> String {
    format!("{REMINDER_ID_PREFIX}{week_offset}")
}

/// Whether an identifier belongs to the scheduler.
#[must_use]
pub fn is_owned(identifier: &str) -> bool {
    identifier.starts_with(REMINDER_ID_PREFIX)
}

/// Title and body for a reminder.
#[must_use]
pub fn reminder_content(variant: MessageVariant, timing: ReminderTiming) -> ReminderContent {
    let (day, day_lower) = match timing {
        ReminderTiming::MorningOf => ("Today", "today"),
        ReminderTiming::EveningBefore | ReminderTiming::None => ("Tomorrow", "tomorrow"),
    };
    let body = match variant {
        MessageVariant::Recycling => format!("{day} is Trash Day. It's also Recycling Day!"),
        MessageVariant::YardWaste => {
            format!("{day} is Yard Waste Day. Don't forget your yard waste!")
        }
        MessageVariant::TrashOnly => format!("{day} is Trash Day."),
        MessageVariant::NoPickup => format!("No pickup scheduled for {day_lower}."),
        MessageVariant::Generic => {
            format!("Trash day reminder! Open Curbside to see details for {day_lower}.")
        }
    };

    ReminderContent {
        title: REMINDER_TITLE.to_owned(),
        body,
    }
}

/// Instant a reminder about `pickup_date` fires.
///
/// Evening-before reminders fire the previous civil day at the configured time; morning-of
/// reminders fire at 07:00 on the pickup day.
#[must_use]
pub fn fire_instant(
    zone: Tz,
    pickup_date: NaiveDate,
    preferences: &ReminderPreferences,
) -> Option<DateTime<Utc>> {
    let fire_date = match preferences.timing {
        ReminderTiming::MorningOf => pickup_date,
        ReminderTiming::EveningBefore | ReminderTiming::None => {
            pickup_date.checked_sub_days(Days::new(1))?
        }
    };
    local_instant(zone, fire_date, preferences.fire_time())
}

#[derive(Debug, Clone, Copy)]
/// Tunables for the scheduler.
pub struct SchedulerSettings {
    /// Zone civil dates and fire times are resolved in.
    pub zone: Tz,
    /// Weeks covered by a full reschedule.
    pub max_weeks: u32,
    /// Platform ceiling on pending notifications.
    pub pending_cap: usize,
    /// Owned pending count below which a refresh is warranted.
    pub low_water_mark: usize,
    /// Reschedule age after which a refresh is warranted.
    pub refresh_after: TimeDelta,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            zone: SERVICE_TIME_ZONE,
            max_weeks: MAX_WEEKS,
            pending_cap: PENDING_CAP,
            low_water_mark: LOW_WATER_MARK,
            refresh_after: TimeDelta::days(REFRESH_AFTER_DAYS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of the scheduler.
pub enum SchedulerState {
    /// Notification permission is missing.
    Unauthorized,
    /// Permitted, but no reminders are scheduled.
    Idle,
    /// Reminders are scheduled.
    Scheduled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// What a full reschedule wrote.
pub struct ScheduleReport {
    /// Reminders accepted by the backend, in pickup-date order.
    pub reminders: Vec<ScheduledReminder>,
    /// Weeks whose fire instant was not in the future.
    pub skipped_past: usize,
    /// Weeks dropped because the pending cap left no room.
    pub skipped_capacity: usize,
    /// Backend rejections.
    pub failed: usize,
    /// Reminders scheduled with the generic message.
    pub fallback_messages: usize,
    /// Whether clearing the previous batch succeeded.
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a full reschedule.
pub enum RescheduleOutcome {
    /// Permission missing; nothing was touched.
    Unauthorized,
    /// Reminders are disabled; owned reminders were cleared.
    Cleared,
    /// A new batch was written.
    Scheduled(ScheduleReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of an opportunistic refresh.
pub enum RefreshOutcome {
    /// Coverage is fresh enough; nothing was written.
    NotNeeded,
    /// A full reschedule ran.
    Rescheduled(RescheduleOutcome),
}

#[derive(Debug)]
struct PlannedReminder {
    week_offset: u32,
    pickup_date: NaiveDate,
    variant: MessageVariant,
}

/// Keeps the notification backend in sync with preferences and the pickup schedule.
///
/// Reschedules are serialized internally; concurrent callers wait their turn.
pub struct NotificationScheduler {
    backend: Arc<dyn NotificationBackend>,
    classifier: Arc<dyn ClassificationPort>,
    preferences: Arc<dyn PreferencesStore>,
    settings: SchedulerSettings,
    state: Mutex<SchedulerState>,
}

impl NotificationScheduler {
    /// Create a scheduler with default settings.
    #[must_use]
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        classifier: Arc<dyn ClassificationPort>,
        preferences: Arc<dyn PreferencesStore>,
    ) -> Self {
        Self {
            backend,
            classifier,
            preferences,
            settings: SchedulerSettings::default(),
            state: Mutex::new(SchedulerState::Unauthorized),
        }
    }

    /// Replace the settings. `max_weeks` is clamped to the pending cap.
    #[must_use]
    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        let cap = u32::try_from(settings.pending_cap).unwrap_or(u32::MAX);
        self.settings = SchedulerSettings {
            max_weeks: settings.max_weeks.min(cap),
            ..settings
        };
        self
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SchedulerState {
        *self.state.lock().await
    }

    /// Ask the backend for permission.
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] reported by the backend.
    pub async fn request_authorization(&self) -> Result<bool, PortError> {
        let mut state = self.state.lock().await;
        let granted = self.backend.request_authorization().await?;
        if granted && *state == SchedulerState::Unauthorized {
            *state = SchedulerState::Idle;
        } else if !granted {
            *state = SchedulerState::Unauthorized;
        }
        info!(granted, "Notification authorization requested");
        Ok(granted)
    }

    /// Identifiers of pending reminders owned by the scheduler.
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] reported by the backend.
    pub async fn owned_pending(&self) -> Result<Vec<String>, PortError> {
        let pending = self.backend.list_pending().await?;
        Ok(pending.into_iter().filter(|identifier| is_owned(identifier)).collect())
    }

    /// Remove every pending notification, owned or not.
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] reported by the backend.
    pub async fn cancel_all(&self) -> Result<(), PortError> {
        let mut state = self.state.lock().await;
        self.backend.remove_all().await?;
        if *state == SchedulerState::Scheduled {
            *state = SchedulerState::Idle;
        }
        Ok(())
    }

    /// Clear owned reminders and, when enabled, regenerate the rolling window.
    ///
    /// Individual backend failures are logged and counted; they never abort the batch.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when reminders are disabled and the owned batch cannot be
    /// cleared, or when the completion timestamp cannot be stored. In both cases the state is
    /// left unchanged; reminders already written stay in place.
    #[instrument(skip(self))]
    pub async fn full_reschedule(&self, now: DateTime<Utc>) -> Result<RescheduleOutcome, PortError> {
        let mut state = self.state.lock().await;
        self.reschedule_locked(&mut state, now).await
    }

    /// Run a full reschedule only when coverage is stale or running low.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::full_reschedule`].
    #[instrument(skip(self))]
    pub async fn refresh_if_needed(&self, now: DateTime<Utc>) -> Result<RefreshOutcome, PortError> {
        let mut state = self.state.lock().await;
        let preferences = ReminderPreferences::load(self.preferences.as_ref());

        let owned = match self.owned_pending().await {
            Ok(owned) => Some(owned.len()),
            Err(err) => {
                warn!(%err, "Could not list pending reminders, judging by age only");
                None
            }
        };
        let last = last_scheduled_at(self.preferences.as_ref());

        if !self.needs_refresh(now, &preferences, last, owned) {
            debug!(?owned, ?last, "Reminder coverage is fresh");
            return Ok(RefreshOutcome::NotNeeded);
        }

        info!(?owned, ?last, "Refreshing reminders");
        self.reschedule_locked(&mut state, now)
            .await
            .map(RefreshOutcome::Rescheduled)
    }

    fn needs_refresh(
        &self,
        now: DateTime<Utc>,
        preferences: &ReminderPreferences,
        last: Option<DateTime<Utc>>,
        owned: Option<usize>,
    ) -> bool {
        if !preferences.wants_reminders() {
            // Only a leftover batch needs clearing.
            return owned.is_some_and(|count| count > 0);
        }
        let stale = last.is_none_or(|at| now - at > self.settings.refresh_after);
        let low = owned.is_some_and(|count| count < self.settings.low_water_mark);
        stale || low
    }

    async fn reschedule_locked(
        &self,
        state: &mut SchedulerState,
        now: DateTime<Utc>,
    ) -> Result<RescheduleOutcome, PortError> {
        if self.backend.authorization_status().await != AuthorizationStatus::Authorized {
            warn!(err = %PortError::PermissionDenied, "Skipping reschedule");
            *state = SchedulerState::Unauthorized;
            return Ok(RescheduleOutcome::Unauthorized);
        }

        let preferences = ReminderPreferences::load(self.preferences.as_ref());
        let pending = match self.backend.list_pending().await {
            Ok(pending) => Some(pending),
            Err(err) => {
                warn!(%err, "Could not list pending reminders");
                None
            }
        };

        // The clear must finish before the first add, or it could remove the new batch.
        let cleared = self.clear_owned(pending.as_deref()).await;

        if !preferences.wants_reminders() {
            if let Err(err) = cleared {
                warn!(%err, "Failed to clear owned reminders, state unchanged");
                return Err(err);
            }
            info!(
                enabled = preferences.notifications_enabled,
                timing = %preferences.timing,
                "Reminders disabled, owned reminders cleared"
            );
            *state = SchedulerState::Idle;
            return Ok(RescheduleOutcome::Cleared);
        }

        let foreign = pending
            .iter()
            .flatten()
            .filter(|identifier| !is_owned(identifier))
            .count();
        let budget = self
            .settings
            .pending_cap
            .saturating_sub(foreign)
            .min(usize::try_from(self.settings.max_weeks).unwrap_or(usize::MAX));

        let planned = self.plan(now, &preferences).await;

        let mut report = ScheduleReport {
            cleared: match cleared {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, "Failed to clear owned reminders");
                    false
                }
            },
            ..ScheduleReport::default()
        };
        for plan in planned {
            let Some(fire_at) = fire_instant(self.settings.zone, plan.pickup_date, &preferences)
                .filter(|fire_at| *fire_at > now)
            else {
                debug!(week_offset = plan.week_offset, pickup_date = %plan.pickup_date, "Fire time already passed");
                report.skipped_past += 1;
                continue;
            };
            if report.reminders.len() >= budget {
                report.skipped_capacity += 1;
                continue;
            }

            let identifier = reminder_identifier(plan.week_offset);
            let request = ReminderRequest {
                identifier: identifier.clone(),
                fire_at,
                content: reminder_content(plan.variant, preferences.timing),
            };
            match self.backend.add_request(&request).await {
                Ok(()) => {
                    if plan.variant == MessageVariant::Generic {
                        report.fallback_messages += 1;
                    }
                    report.reminders.push(ScheduledReminder {
                        identifier,
                        fire_at,
                        week_offset: plan.week_offset,
                        pickup_date: plan.pickup_date,
                        variant: plan.variant,
                    });
                }
                Err(err) => {
                    warn!(%identifier, pickup_date = %plan.pickup_date, %err, "Failed to schedule reminder");
                    report.failed += 1;
                }
            }
        }

        record_scheduled_at(self.preferences.as_ref(), now)?;
        *state = SchedulerState::Scheduled;

        info!(
            scheduled = report.reminders.len(),
            skipped_past = report.skipped_past,
            skipped_capacity = report.skipped_capacity,
            failed = report.failed,
            fallback_messages = report.fallback_messages,
            "Reminders rescheduled"
        );
        Ok(RescheduleOutcome::Scheduled(report))
    }

    /// Remove every owned reminder in one backend call.
    async fn clear_owned(&self, pending: Option<&[String]>) -> Result<(), PortError> {
        let mut identifiers: BTreeSet<String> =
            (0..self.settings.max_weeks).map(reminder_identifier).collect();
        identifiers.extend(
            pending
                .unwrap_or_default()
                .iter()
                .filter(|identifier| is_owned(identifier))
                .cloned(),
        );
        let identifiers: Vec<String> = identifiers.into_iter().collect();

        self.backend.remove_by_identifiers(&identifiers).await
    }

    /// Classify every week of the window concurrently, then order by pickup date.
    async fn plan(
        &self,
        now: DateTime<Utc>,
        preferences: &ReminderPreferences,
    ) -> Vec<PlannedReminder> {
        let today = civil_date(now, self.settings.zone);
        let weekday = preferences.selected_weekday;

        let lookups = (0..self.settings.max_weeks).filter_map(|week_offset| {
            let reference = today.checked_add_days(Days::new(7 * u64::from(week_offset)))?;
            let pickup_date = next_occurrence(reference, weekday);
            let classifier = Arc::clone(&self.classifier);
            Some(async move {
                let variant = match classifier.classify_date(pickup_date).await {
                    Ok(pickup_type) => MessageVariant::from(pickup_type),
                    Err(err) => {
                        warn!(week_offset, %pickup_date, %err, "Using generic reminder text");
                        MessageVariant::Generic
                    }
                };
                PlannedReminder {
                    week_offset,
                    pickup_date,
                    variant,
                }
            })
        });

        let mut planned = join_all(lookups).await;
        planned.sort_by_key(|plan| (plan.pickup_date, plan.week_offset));
        planned
    }
}
