use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::Identity;

use super::storage::{MemoryStorage, SessionStorage};

/// In-memory view of the current session.
///
/// `identity` and `credential` are only ever set and cleared together, so
/// the fields stay private and are mutated solely by [`SessionStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    credential: Option<String>,
    restored: bool,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Bearer token, if one is held
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.credential.is_some()
    }

    /// Whether the persisted copy has been loaded. Until then an empty session
    /// means "not yet known", not "logged out".
    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

/// Serialized form of the session as written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: Option<Identity>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl SessionData {
    fn from_session(session: &Session) -> Self {
        Self {
            user: session.identity.clone(),
            token: session.credential.clone(),
            is_authenticated: session.is_authenticated(),
        }
    }

    /// Parse a stored entry. `Ok(None)` is a well-formed logged-out record;
    /// any inconsistency between the fields is an error.
    pub fn parse(contents: &str) -> Result<Option<(Identity, String)>> {
        let data: SessionData =
            serde_json::from_str(contents).context("Failed to parse session entry")?;

        match (data.user, data.token, data.is_authenticated) {
            (Some(user), Some(token), true) if !token.is_empty() => Ok(Some((user, token))),
            (None, None, false) => Ok(None),
            _ => Err(anyhow::anyhow!("Inconsistent session entry")),
        }
    }
}

/// Result of the one-time startup restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A valid persisted session was installed
    Restored,
    /// Nothing was installed: the entry was missing or unusable, or a login
    /// earlier in this process already holds the session
    Empty,
    /// A stored entry was malformed and has been removed
    Discarded,
    /// `restore` had already run in this process
    AlreadyRestored,
}

/// Shared handle to the single session of a running client.
///
/// Cloning is cheap and every clone observes the same state. Mutations are
/// applied through the watch channel, so readers never see a half-updated
/// session and subscribers are notified after each change.
///
/// Each mutation and its storage write run under one write lock, so the
/// persisted entry always matches the last applied change.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
    storage: Arc<dyn SessionStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            state: Arc::new(state),
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    // ===== Read access =====

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().credential.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_restored(&self) -> bool {
        self.state.borrow().restored
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolves once `restore` has completed.
    pub async fn wait_restored(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|session| session.restored).await;
    }

    // ===== Mutation =====

    /// Replace the current identity and credential and persist them.
    pub fn login(&self, identity: Identity, credential: String) {
        let _guard = self.lock_writes();
        let username = identity.username.clone();
        self.state.send_modify(|session| {
            session.identity = Some(identity);
            session.credential = Some(credential);
        });
        info!(user = %username, "Session established");

        let record = SessionData::from_session(&self.state.borrow());
        self.persist(&record);
    }

    /// Clear the session and remove the persisted entry. Calling this while
    /// already logged out changes nothing and notifies nobody.
    pub fn logout(&self) {
        let _guard = self.lock_writes();
        let changed = self.state.send_if_modified(|session| {
            if session.identity.is_none() && session.credential.is_none() {
                return false;
            }
            session.identity = None;
            session.credential = None;
            true
        });

        if changed {
            info!("Session cleared");
        } else {
            debug!("Logout while already logged out");
        }
        self.remove_persisted();
    }

    /// Load the persisted session, once per process. Always marks the store
    /// as restored, whatever was (or wasn't) found.
    pub fn restore(&self) -> RestoreOutcome {
        let _guard = self.lock_writes();
        if self.state.borrow().restored {
            debug!("Session already restored");
            return RestoreOutcome::AlreadyRestored;
        }

        let parsed = match self.storage.load() {
            Ok(Some(contents)) => Some(SessionData::parse(&contents)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                None
            }
        };

        let (outcome, found) = match parsed {
            Some(Ok(Some(found))) => (RestoreOutcome::Restored, Some(found)),
            Some(Ok(None)) | None => (RestoreOutcome::Empty, None),
            Some(Err(e)) => {
                warn!(error = %e, "Discarding malformed persisted session");
                self.remove_persisted();
                (RestoreOutcome::Discarded, None)
            }
        };

        let mut outcome = outcome;
        self.state.send_modify(|session| {
            session.restored = true;
            // A login that happened before restore is newer than anything on disk
            if session.is_authenticated() {
                if outcome == RestoreOutcome::Restored {
                    outcome = RestoreOutcome::Empty;
                }
                return;
            }
            if let Some((identity, credential)) = found {
                session.identity = Some(identity);
                session.credential = Some(credential);
            }
        });

        debug!(?outcome, authenticated = self.is_authenticated(), "Session restore complete");
        outcome
    }

    // ===== Persistence =====

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, record: &SessionData) {
        let result = serde_json::to_string_pretty(record)
            .context("Failed to serialize session")
            .and_then(|contents| self.storage.save(&contents));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.storage.remove() {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::storage::FileStorage;

    fn ana() -> Identity {
        Identity {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role: "USER".to_string(),
        }
    }

    fn memory_store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::default());
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }

    fn assert_paired(session: &Session) {
        assert_eq!(session.identity().is_some(), session.credential().is_some());
        assert_eq!(session.is_authenticated(), session.identity().is_some());
    }

    #[test]
    fn test_new_store_is_empty_and_unrestored() {
        let store = SessionStore::in_memory();
        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert!(!session.is_restored());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_login_sets_state_and_persists_record() {
        let (storage, store) = memory_store();
        store.login(ana(), "tok-123".to_string());

        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert_eq!(store.identity(), Some(ana()));

        let persisted: SessionData =
            serde_json::from_str(&storage.contents().unwrap()).unwrap();
        assert_eq!(
            persisted,
            SessionData {
                user: Some(ana()),
                token: Some("tok-123".to_string()),
                is_authenticated: true,
            }
        );
    }

    #[test]
    fn test_login_replaces_previous_session() {
        let (_, store) = memory_store();
        store.login(ana(), "tok-1".to_string());
        let mut bo = ana();
        bo.id = 2;
        bo.username = "bo".to_string();
        store.login(bo.clone(), "tok-2".to_string());

        assert_eq!(store.identity(), Some(bo));
        assert_eq!(store.token().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_logout_clears_and_removes_entry() {
        let (storage, store) = memory_store();
        store.login(ana(), "tok-123".to_string());
        store.logout();

        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
        assert!(session.credential().is_none());
        assert!(storage.contents().is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let (_, store) = memory_store();
        store.restore();
        let before = store.snapshot();
        let mut rx = store.subscribe();

        store.logout();
        store.logout();

        assert_eq!(store.snapshot(), before);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_identity_and_credential_always_paired() {
        let (_, store) = memory_store();
        assert_paired(&store.snapshot());
        for i in 0..6 {
            if i % 3 == 2 {
                store.logout();
            } else {
                store.login(ana(), format!("tok-{}", i));
            }
            assert_paired(&store.snapshot());
        }
        store.restore();
        assert_paired(&store.snapshot());
    }

    #[test]
    fn test_persistence_failure_keeps_memory_state() {
        let (storage, store) = memory_store();
        storage.set_fail_writes(true);

        store.login(ana(), "tok-123".to_string());
        assert!(store.is_authenticated());
        assert!(storage.contents().is_none());

        storage.set_fail_writes(false);
        store.login(ana(), "tok-123".to_string());
        storage.set_fail_writes(true);
        store.logout();
        assert!(!store.is_authenticated());
        // Removal failed, entry is still on disk but memory is authoritative
        assert!(storage.contents().is_some());
    }

    #[test]
    fn test_restore_empty() {
        let (_, store) = memory_store();
        assert_eq!(store.restore(), RestoreOutcome::Empty);
        assert!(store.is_restored());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_runs_once() {
        let (storage, store) = memory_store();
        assert_eq!(store.restore(), RestoreOutcome::Empty);

        storage
            .save(&serde_json::to_string(&SessionData {
                user: Some(ana()),
                token: Some("late".to_string()),
                is_authenticated: true,
            })
            .unwrap())
            .unwrap();

        assert_eq!(store.restore(), RestoreOutcome::AlreadyRestored);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_malformed_entry_is_discarded() {
        for contents in [
            "not json",
            r#"{"user": null, "token": "tok", "isAuthenticated": true}"#,
            r#"{"user": {"id": 1, "username": "ana", "email": "a@b.c", "role": "USER"}, "token": null, "isAuthenticated": true}"#,
            r#"{"user": {"id": 1, "username": "ana", "email": "a@b.c", "role": "USER"}, "token": "tok", "isAuthenticated": false}"#,
            r#"{"user": {"id": 1, "username": "ana", "email": "a@b.c", "role": "USER"}, "token": "", "isAuthenticated": true}"#,
        ] {
            let storage = Arc::new(MemoryStorage::with_contents(contents));
            let store = SessionStore::new(storage.clone());

            assert_eq!(store.restore(), RestoreOutcome::Discarded, "{}", contents);
            assert!(store.is_restored());
            assert!(!store.is_authenticated());
            assert!(storage.contents().is_none());
        }
    }

    #[test]
    fn test_restore_logged_out_record_is_empty() {
        let storage = Arc::new(MemoryStorage::with_contents(
            r#"{"user": null, "token": null, "isAuthenticated": false}"#,
        ));
        let store = SessionStore::new(storage);
        assert_eq!(store.restore(), RestoreOutcome::Empty);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_does_not_override_newer_login() {
        let storage = Arc::new(MemoryStorage::with_contents(
            serde_json::to_string(&SessionData {
                user: Some(ana()),
                token: Some("stale".to_string()),
                is_authenticated: true,
            })
            .unwrap(),
        ));
        let store = SessionStore::new(storage);
        store.login(ana(), "fresh".to_string());

        assert_eq!(store.restore(), RestoreOutcome::Empty);
        assert!(store.is_restored());
        assert_eq!(store.token().as_deref(), Some("fresh"));
    }

    /// Storage whose next write signals the test and then stalls, leaving
    /// a window for another thread to mutate the store.
    struct StallingStorage {
        inner: MemoryStorage,
        armed: Mutex<Option<std::sync::mpsc::Sender<()>>>,
    }

    impl StallingStorage {
        fn new() -> Self {
            Self {
                inner: MemoryStorage::default(),
                armed: Mutex::new(None),
            }
        }

        fn arm(&self) -> std::sync::mpsc::Receiver<()> {
            let (tx, rx) = std::sync::mpsc::channel();
            *self.armed.lock().unwrap() = Some(tx);
            rx
        }

        fn stall(&self) {
            if let Some(tx) = self.armed.lock().unwrap().take() {
                tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }

    impl SessionStorage for StallingStorage {
        fn load(&self) -> Result<Option<String>> {
            self.inner.load()
        }

        fn save(&self, contents: &str) -> Result<()> {
            self.stall();
            self.inner.save(contents)
        }

        fn remove(&self) -> Result<()> {
            self.stall();
            self.inner.remove()
        }
    }

    #[test]
    fn test_logout_during_login_write_leaves_nothing_persisted() {
        let storage = Arc::new(StallingStorage::new());
        let store = SessionStore::new(storage.clone());
        store.restore();
        let entered = storage.arm();

        let login = {
            let store = store.clone();
            std::thread::spawn(move || store.login(ana(), "tok".to_string()))
        };
        entered.recv().unwrap();
        // Lands while login is still writing
        store.logout();
        login.join().unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(storage.inner.contents(), None);

        let next = SessionStore::new(storage.clone());
        assert_eq!(next.restore(), RestoreOutcome::Empty);
        assert!(!next.is_authenticated());
    }

    #[test]
    fn test_login_during_logout_write_stays_persisted() {
        let storage = Arc::new(StallingStorage::new());
        let store = SessionStore::new(storage.clone());
        store.restore();
        store.login(ana(), "old".to_string());
        let entered = storage.arm();

        let logout = {
            let store = store.clone();
            std::thread::spawn(move || store.logout())
        };
        entered.recv().unwrap();
        store.login(ana(), "new".to_string());
        logout.join().unwrap();

        assert_eq!(store.token().as_deref(), Some("new"));
        let next = SessionStore::new(storage.clone());
        assert_eq!(next.restore(), RestoreOutcome::Restored);
        assert_eq!(next.token().as_deref(), Some("new"));
    }

    #[test]
    fn test_persistence_round_trip_across_processes() {
        let dir = tempfile::tempdir().unwrap();

        let first = SessionStore::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        first.restore();
        first.login(ana(), "tok-123".to_string());
        drop(first);

        let second = SessionStore::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        assert_eq!(second.restore(), RestoreOutcome::Restored);
        assert!(second.is_authenticated());
        assert_eq!(second.identity(), Some(ana()));
        assert_eq!(second.token().as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_round_trip_after_logout_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let first = SessionStore::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        first.login(ana(), "tok-123".to_string());
        first.logout();

        let second = SessionStore::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        assert_eq!(second.restore(), RestoreOutcome::Empty);
    }

    #[test]
    fn test_clones_share_state() {
        let (_, store) = memory_store();
        let other = store.clone();
        store.login(ana(), "tok".to_string());
        assert!(other.is_authenticated());
        other.logout();
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (_, store) = memory_store();
        let mut rx = store.subscribe();

        store.login(ana(), "tok".to_string());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());

        store.logout();
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn test_wait_restored_resolves_after_restore() {
        let (_, store) = memory_store();
        let waiter = store.clone();
        let handle = tokio::spawn(async move { waiter.wait_restored().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        store.restore();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
