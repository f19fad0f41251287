use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::{Credentials, Device, GroupId, UserProfile};

/// Cross-screen state for the running application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub loading: bool,
    pub credentials: Option<Credentials>,
    pub user: Option<UserProfile>,
    pub groups: Vec<GroupId>,
    pub devices: Vec<Device>,
}

/// Names of the fields a [`SessionStore`] accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    Loading,
    Credentials,
    User,
    Groups,
    Devices,
}

impl SessionField {
    pub const ALL: [SessionField; 5] = [
        SessionField::Loading,
        SessionField::Credentials,
        SessionField::User,
        SessionField::Groups,
        SessionField::Devices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionField::Loading => "loading",
            SessionField::Credentials => "credentials",
            SessionField::User => "user",
            SessionField::Groups => "groups",
            SessionField::Devices => "devices",
        }
    }
}

impl fmt::Display for SessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionField {
    type Err = SessionError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        SessionField::ALL
            .into_iter()
            .find(|field| field.as_str() == key)
            .ok_or_else(|| SessionError::UnknownField(key.to_string()))
    }
}

/// A single write to the session, one variant per field
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Loading(bool),
    Credentials(Option<Credentials>),
    User(Option<UserProfile>),
    Groups(Vec<GroupId>),
    Devices(Vec<Device>),
}

impl SessionUpdate {
    pub fn field(&self) -> SessionField {
        match self {
            SessionUpdate::Loading(_) => SessionField::Loading,
            SessionUpdate::Credentials(_) => SessionField::Credentials,
            SessionUpdate::User(_) => SessionField::User,
            SessionUpdate::Groups(_) => SessionField::Groups,
            SessionUpdate::Devices(_) => SessionField::Devices,
        }
    }

    /// Build an update from a field name and an untyped JSON value
    pub fn from_json(key: &str, value: Value) -> Result<Self, SessionError> {
        let field: SessionField = key.parse()?;
        let invalid = |e: serde_json::Error| SessionError::InvalidValue {
            field: field.as_str(),
            reason: e.to_string(),
        };

        Ok(match field {
            SessionField::Loading => SessionUpdate::Loading(serde_json::from_value(value).map_err(invalid)?),
            SessionField::Credentials => {
                // JSON null clears the token
                SessionUpdate::Credentials((!value.is_null()).then(|| Credentials::new(value)))
            }
            SessionField::User => SessionUpdate::User(serde_json::from_value(value).map_err(invalid)?),
            SessionField::Groups => SessionUpdate::Groups(serde_json::from_value(value).map_err(invalid)?),
            SessionField::Devices => SessionUpdate::Devices(serde_json::from_value(value).map_err(invalid)?),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no session field named '{0}'")]
    UnknownField(String),
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Shared handle to the session state.
///
/// Cloning the handle shares the underlying state; construct a fresh store
/// for an isolated session (tests do this).
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    loading_tx: Arc<watch::Sender<bool>>,
    // outstanding LoadingGuards
    busy: Arc<AtomicUsize>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.read())
            .finish()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (loading_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            loading_tx: Arc::new(loading_tx),
            busy: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Commit a value to its field. The write is visible to every getter
    /// once this returns.
    pub fn update(&self, update: SessionUpdate) {
        let field = update.field();
        {
            let mut state = self.state.write();
            match update {
                SessionUpdate::Loading(value) => state.loading = value,
                SessionUpdate::Credentials(value) => state.credentials = value,
                SessionUpdate::User(value) => state.user = value,
                SessionUpdate::Groups(value) => state.groups = value,
                SessionUpdate::Devices(value) => state.devices = value,
            }
            // published under the lock so watchers see writes in order
            if field == SessionField::Loading {
                self.publish_loading(state.loading);
            }
        }
        debug!("session field '{}' updated", field);
    }

    /// Commit a value, then run `on_complete`
    pub fn update_and_then<F: FnOnce()>(&self, update: SessionUpdate, on_complete: F) {
        self.update(update);
        on_complete();
    }

    /// String-keyed update. Unknown keys and values of the wrong shape are
    /// rejected and leave the state untouched.
    pub fn update_by_key(&self, key: &str, value: Value) -> Result<(), SessionError> {
        match SessionUpdate::from_json(key, value) {
            Ok(update) => {
                self.update(update);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected session update: {}", e);
                Err(e)
            }
        }
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.state.read().credentials.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    pub fn groups(&self) -> Vec<GroupId> {
        self.state.read().groups.clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.read().devices.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Observe the loading flag, e.g. to drive a busy indicator
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    /// Mark the session busy until the returned guard is dropped. Guards
    /// nest: loading clears when the last one goes.
    pub fn begin_loading(&self) -> LoadingGuard {
        self.set_busy(|busy| busy + 1);
        LoadingGuard {
            store: self.clone(),
        }
    }

    /// Back to defaults, as after a restart
    pub fn reset(&self) {
        let mut state = self.state.write();
        *state = SessionState::default();
        self.busy.store(0, Ordering::SeqCst);
        self.publish_loading(false);
    }

    // Guard bookkeeping happens under the state lock so a guard ending
    // can't race one starting
    fn set_busy(&self, next: impl FnOnce(usize) -> usize) {
        let mut state = self.state.write();
        let busy = next(self.busy.load(Ordering::SeqCst));
        self.busy.store(busy, Ordering::SeqCst);
        state.loading = busy > 0;
        self.publish_loading(state.loading);
    }

    fn publish_loading(&self, loading: bool) {
        self.loading_tx.send_if_modified(|current| {
            if *current == loading {
                return false;
            }
            *current = loading;
            true
        });
    }
}

/// Clears the loading flag when dropped, whichever way the call ended
#[must_use = "loading is cleared as soon as the guard is dropped"]
pub struct LoadingGuard {
    store: SessionStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store.set_busy(|busy| busy.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    fn device(id: &str, name: &str) -> Device {
        Device {
            id: id.to_string(),
            name: name.to_string(),
            serial_number: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_update_round_trips_every_field() {
        let store = SessionStore::new();
        let user = UserProfile {
            full_name: "Dana Driver".into(),
            customer_name: "Acme Freight".into(),
            phone_number: Some("5551234567".into()),
            email: None,
        };
        let credentials = Credentials::new(json!({ "sessionId": "abc", "database": "fleet" }));

        store.update(SessionUpdate::Loading(true));
        store.update(SessionUpdate::Credentials(Some(credentials.clone())));
        store.update(SessionUpdate::User(Some(user.clone())));
        store.update(SessionUpdate::Groups(vec![GroupId::new("G1")]));
        store.update(SessionUpdate::Devices(vec![device("b1", "Truck 1")]));

        assert!(store.loading());
        assert_eq!(store.credentials(), Some(credentials));
        assert_eq!(store.user(), Some(user));
        assert_eq!(store.groups(), vec![GroupId::new("G1")]);
        assert_eq!(store.devices(), vec![device("b1", "Truck 1")]);
    }

    #[test]
    fn test_update_by_key_round_trips() {
        let store = SessionStore::new();

        store.update_by_key("loading", json!(true)).unwrap();
        store.update_by_key("credentials", json!({ "sessionId": "s" })).unwrap();
        store
            .update_by_key("user", json!({ "full_name": "Dana", "customer_name": "Acme" }))
            .unwrap();
        store.update_by_key("groups", json!(["G1", "G2"])).unwrap();
        store
            .update_by_key("devices", json!([{ "id": "b1", "name": "Truck 1" }]))
            .unwrap();

        let state = store.snapshot();
        assert!(state.loading);
        assert_eq!(state.credentials, Some(Credentials::new(json!({ "sessionId": "s" }))));
        assert_eq!(state.user.unwrap().full_name, "Dana");
        assert_eq!(state.groups, vec![GroupId::new("G1"), GroupId::new("G2")]);
        assert_eq!(state.devices, vec![device("b1", "Truck 1")]);
    }

    #[test]
    fn test_unknown_key_is_rejected_without_changes() {
        let store = SessionStore::new();
        store.update(SessionUpdate::Groups(vec![GroupId::new("G1")]));
        let before = store.snapshot();

        let err = store.update_by_key("vehicles", json!([])).unwrap_err();

        assert!(matches!(err, SessionError::UnknownField(ref key) if key == "vehicles"));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_badly_shaped_value_is_rejected_without_changes() {
        let store = SessionStore::new();
        let before = store.snapshot();

        let err = store.update_by_key("groups", json!("G1")).unwrap_err();

        assert!(matches!(err, SessionError::InvalidValue { field: "groups", .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_null_credentials_clear_the_token() {
        let store = SessionStore::new();
        store.update(SessionUpdate::Credentials(Some(Credentials::new(json!("t")))));

        store.update_by_key("credentials", Value::Null).unwrap();

        assert_eq!(store.credentials(), None);
    }

    #[test]
    fn test_update_and_then_runs_after_commit() {
        let store = SessionStore::new();
        let seen = Cell::new(None);

        store.update_and_then(SessionUpdate::Groups(vec![GroupId::new("G7")]), || {
            seen.set(store.groups().first().cloned());
        });

        assert_eq!(seen.take(), Some(GroupId::new("G7")));
    }

    #[test]
    fn test_field_names_parse() {
        for field in SessionField::ALL {
            assert_eq!(field.as_str().parse::<SessionField>().unwrap(), field);
        }
        assert!("Loading".parse::<SessionField>().is_err());
    }

    #[test]
    fn test_clones_share_state_but_new_stores_do_not() {
        let store = SessionStore::new();
        let handle = store.clone();
        let other = SessionStore::new();

        handle.update(SessionUpdate::Groups(vec![GroupId::new("G1")]));

        assert_eq!(store.groups(), vec![GroupId::new("G1")]);
        assert!(other.groups().is_empty());
    }

    #[test]
    fn test_loading_guard_clears_flag_on_drop() {
        let store = SessionStore::new();
        {
            let _guard = store.begin_loading();
            assert!(store.loading());
        }
        assert!(!store.loading());
    }

    #[test]
    fn test_nested_loading_guards_clear_with_the_outermost() {
        let store = SessionStore::new();
        let outer = store.begin_loading();
        {
            let _inner = store.begin_loading();
        }
        assert!(store.loading());
        drop(outer);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_loading_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe_loading();
        assert!(!*rx.borrow());

        store.update(SessionUpdate::Loading(true));
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        store.update(SessionUpdate::Loading(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = SessionStore::new();
        store.update(SessionUpdate::Loading(true));
        store.update(SessionUpdate::Groups(vec![GroupId::new("G1")]));

        store.reset();

        assert_eq!(store.snapshot(), SessionState::default());
        assert!(!*store.subscribe_loading().borrow());
    }
}
