//! Traits describing external collaborators and the errors they report.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Error as ReqwestError;

use crate::dates::InvalidDateFormat;
use crate::model::{PickupType, ReminderRequest};

#[derive(thiserror::Error, Debug)]
/// Errors reported by the classification, preference and notification ports.
pub enum PortError {
    /// A date string was malformed or named an impossible day.
    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDateFormat),
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Classification could not be obtained for a date.
    #[error("Classification unavailable: {0}")]
    ClassificationUnavailable(String),
    /// A single notification backend call failed.
    #[error("Notification backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The user has not granted notification permission.
    #[error("Notification permission denied")]
    PermissionDenied,
    /// A stored preference could not be written or read back.
    #[error("Invalid preference {key}: {reason}")]
    InvalidPreference {
        /// Preference key.
        key: String,
        /// What went wrong.
        reason: String,
    },
    /// A service calendar document was rejected.
    #[error("Invalid calendar: {0}")]
    InvalidCalendar(String),
}

#[async_trait]
/// Source of pickup classifications used while scheduling reminders.
pub trait ClassificationPort: Send + Sync {
    /// Classify a single civil date.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the classification cannot be obtained.
    async fn classify_date(&self, date: NaiveDate) -> Result<PickupType, PortError>;
}

/// Key/value settings store owned by another component.
pub trait PreferencesStore: Send + Sync {
    /// Read a raw value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot persist the value.
    fn set(&self, key: &str, value: String) -> Result<(), PortError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Permission state reported by the notification backend.
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Notifications may be scheduled.
    Authorized,
    /// The user declined or revoked permission.
    Denied,
}

#[async_trait]
/// Platform notification subsystem holding pending local reminders.
pub trait NotificationBackend: Send + Sync {
    /// Current permission state.
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for permission, returning whether it was granted.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request could not be made.
    async fn request_authorization(&self) -> Result<bool, PortError>;

    /// Add or replace a pending request.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend refuses the request.
    async fn add_request(&self, request: &ReminderRequest) -> Result<(), PortError>;

    /// Remove pending requests with the given identifiers. Unknown identifiers are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend call fails.
    async fn remove_by_identifiers(&self, identifiers: &[String]) -> Result<(), PortError>;

    /// Remove every pending request, including ones this crate does not own.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend call fails.
    async fn remove_all(&self) -> Result<(), PortError>;

    /// Identifiers of all pending requests.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend call fails.
    async fn list_pending(&self) -> Result<Vec<String>, PortError>;
}
