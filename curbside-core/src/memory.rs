//! In-memory port implementations for tests and dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;

use crate::model::ReminderRequest;
use crate::ports::{AuthorizationStatus, NotificationBackend, PortError, PreferencesStore};
use crate::scheduler::PENDING_CAP;

#[derive(Debug, Default)]
/// Preferences kept in a map.
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    /// Build a store pre-populated with the given pairs.
    #[must_use]
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            values: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl PreferencesStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), PortError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Counters of backend calls, for asserting on side effects.
pub struct CallCounts {
    /// `add_request` calls, successful or not.
    pub add: usize,
    /// `remove_by_identifiers` calls.
    pub remove_by_identifiers: usize,
    /// `remove_all` calls.
    pub remove_all: usize,
    /// `list_pending` calls.
    pub list_pending: usize,
}

impl CallCounts {
    /// Calls that modify pending state.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.add + self.remove_by_identifiers + self.remove_all
    }
}

#[derive(Debug)]
struct CenterState {
    status: AuthorizationStatus,
    grant_on_request: bool,
    pending: BTreeMap<String, ReminderRequest>,
    failing_identifiers: HashSet<String>,
    fail_removals: bool,
    capacity: usize,
    calls: CallCounts,
}

#[derive(Debug)]
/// Notification backend holding pending requests in memory.
///
/// Enforces a pending capacity like the platform does and can be told to fail individual calls.
pub struct MemoryNotificationCenter {
    state: Mutex<CenterState>,
}

impl Default for MemoryNotificationCenter {
    fn default() -> Self {
        Self::new(AuthorizationStatus::Authorized)
    }
}

impl MemoryNotificationCenter {
    /// Create an empty center with the given permission state.
    #[must_use]
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            state: Mutex::new(CenterState {
                status,
                grant_on_request: true,
                pending: BTreeMap::new(),
                failing_identifiers: HashSet::new(),
                fail_removals: false,
                capacity: PENDING_CAP,
                calls: CallCounts::default(),
            }),
        }
    }

    /// Use a different pending capacity.
    #[must_use]
    pub fn with_capacity(self, capacity: usize) -> Self {
        self.lock().capacity = capacity;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CenterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a later `request_authorization` grants permission.
    pub fn set_grant_on_request(&self, grant: bool) {
        self.lock().grant_on_request = grant;
    }

    /// Change the permission state, e.g. to simulate revocation.
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.lock().status = status;
    }

    /// Make `add_request` fail for this identifier.
    pub fn fail_identifier(&self, identifier: impl Into<String>) {
        self.lock().failing_identifiers.insert(identifier.into());
    }

    /// Make every removal call fail.
    pub fn fail_removals(&self, fail: bool) {
        self.lock().fail_removals = fail;
    }

    /// Insert a request directly, bypassing call counting.
    pub fn seed(&self, request: ReminderRequest) {
        self.lock().pending.insert(request.identifier.clone(), request);
    }

    /// Snapshot of pending requests ordered by identifier.
    #[must_use]
    pub fn pending(&self) -> Vec<ReminderRequest> {
        self.lock().pending.values().cloned().collect()
    }

    /// Snapshot of pending requests ordered by fire instant.
    #[must_use]
    pub fn pending_by_fire_time(&self) -> Vec<ReminderRequest> {
        let mut requests = self.pending();
        requests.sort_by_key(|request| request.fire_at);
        requests
    }

    /// Call counters so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Reset call counters, keeping pending requests.
    pub fn reset_calls(&self) {
        self.lock().calls = CallCounts::default();
    }
}

#[async_trait]
impl NotificationBackend for MemoryNotificationCenter {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.lock().status
    }

    async fn request_authorization(&self) -> Result<bool, PortError> {
        let mut state = self.lock();
        if state.status == AuthorizationStatus::NotDetermined {
            state.status = if state.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
        }
        Ok(state.status == AuthorizationStatus::Authorized)
    }

    async fn add_request(&self, request: &ReminderRequest) -> Result<(), PortError> {
        let mut state = self.lock();
        state.calls.add += 1;

        if state.status != AuthorizationStatus::Authorized {
            return Err(PortError::PermissionDenied);
        }
        if state.failing_identifiers.contains(&request.identifier) {
            return Err(PortError::BackendUnavailable(format!(
                "rejected {}",
                request.identifier
            )));
        }
        let is_new = !state.pending.contains_key(&request.identifier);
        if is_new && state.pending.len() >= state.capacity {
            return Err(PortError::BackendUnavailable(format!(
                "pending capacity of {} reached",
                state.capacity
            )));
        }

        state
            .pending
            .insert(request.identifier.clone(), request.clone());
        Ok(())
    }

    async fn remove_by_identifiers(&self, identifiers: &[String]) -> Result<(), PortError> {
        let mut state = self.lock();
        state.calls.remove_by_identifiers += 1;
        if state.fail_removals {
            return Err(PortError::BackendUnavailable("removal failed".to_owned()));
        }
        for identifier in identifiers {
            state.pending.remove(identifier);
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), PortError> {
        let mut state = self.lock();
        state.calls.remove_all += 1;
        if state.fail_removals {
            return Err(PortError::BackendUnavailable("removal failed".to_owned()));
        }
        state.pending.clear();
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<String>, PortError> {
        let mut state = self.lock();
        state.calls.list_pending += 1;
        Ok(state.pending.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::ReminderContent;

    fn request(identifier: &str) -> ReminderRequest {
        ReminderRequest {
            identifier: identifier.to_owned(),
            fire_at: Utc
                .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
                .single()
                .expect("valid instant"),
            content: ReminderContent {
                title: "title".to_owned(),
                body: "body".to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn enforces_pending_capacity() {
        let center = MemoryNotificationCenter::default();
        for index in 0..PENDING_CAP {
            center
                .add_request(&request(&format!("other_{index}")))
                .await
                .expect("below capacity");
        }
        assert!(matches!(
            center.add_request(&request("overflow")).await,
            Err(PortError::BackendUnavailable(_))
        ));
        // Replacing an existing identifier does not grow the set.
        assert!(center.add_request(&request("other_0")).await.is_ok());
        assert_eq!(center.pending().len(), PENDING_CAP);
    }

    #[tokio::test]
    async fn capacity_can_be_lowered() {
        let center = MemoryNotificationCenter::default().with_capacity(1);
        center.add_request(&request("first")).await.expect("below capacity");
        assert!(center.add_request(&request("second")).await.is_err());
        assert_eq!(center.calls().add, 2);
    }

    #[tokio::test]
    async fn authorization_follows_the_configured_answer() {
        let center = MemoryNotificationCenter::new(AuthorizationStatus::NotDetermined);
        center.set_grant_on_request(false);
        assert!(!center.request_authorization().await.expect("request succeeds"));
        assert_eq!(center.authorization_status().await, AuthorizationStatus::Denied);
        assert!(matches!(
            center.add_request(&request("any")).await,
            Err(PortError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn removal_ignores_unknown_identifiers() {
        let center = MemoryNotificationCenter::default();
        center.seed(request("kept"));
        center.seed(request("dropped"));
        center
            .remove_by_identifiers(&["dropped".to_owned(), "missing".to_owned()])
            .await
            .expect("removal succeeds");
        assert_eq!(
            center.list_pending().await.expect("listing succeeds"),
            vec!["kept".to_owned()]
        );
        assert_eq!(center.calls().remove_by_identifiers, 1);
    }
}
