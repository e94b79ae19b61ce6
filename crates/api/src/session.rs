//! Session state shared by every surface of the client.
//!
//! A single injected store owns the credentials and publishes changes
//! over a watch channel, so every open view observes login and logout
//! consistently instead of reading global storage ad hoc.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use operis_core::domain::user::UserProfile;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not read session file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write session file `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("session file is corrupted: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Publicly observable session state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub profile: Option<UserProfile>,
    /// Set when the session was force-cleared by an auth failure; names
    /// the operation to return to after a fresh login.
    pub return_url: Option<String>,
}

/// On-disk shape; the key names match what the backend issues.
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Default)]
struct SessionInner {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    profile: Option<UserProfile>,
    /// Bumped on every token install; used by the refresh gate to tell
    /// whether another caller already swapped the token.
    generation: u64,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionInner>>,
    changes: watch::Sender<SessionSnapshot>,
    file: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        let (changes, _) = watch::channel(SessionSnapshot::default());
        Self { inner: Arc::new(RwLock::new(SessionInner::default())), changes, file: None }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::in_memory();
        store.file = Some(path.into());
        store
    }

    /// Restore a persisted session if one exists. Returns whether a
    /// session was loaded.
    pub fn load(&self) -> Result<bool, SessionError> {
        let Some(path) = &self.file else {
            return Ok(false);
        };

        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(SessionError::Read { path: path.clone(), source }),
        };

        let persisted: PersistedSession = serde_json::from_slice(&raw)?;
        {
            let mut inner = self.write();
            inner.access = Some(persisted.access_token.into());
            inner.refresh = persisted.refresh_token.map(Into::into);
            inner.profile = persisted.user;
            inner.generation += 1;
        }
        self.publish(None);
        Ok(true)
    }

    /// Install a fresh login: tokens plus the profile that owns them.
    pub fn install_login(
        &self,
        access: SecretString,
        refresh: Option<SecretString>,
        profile: UserProfile,
    ) -> Result<(), SessionError> {
        {
            let mut inner = self.write();
            inner.access = Some(access);
            inner.refresh = refresh;
            inner.profile = Some(profile);
            inner.generation += 1;
        }
        self.persist()?;
        self.publish(None);
        Ok(())
    }

    /// Swap tokens after a successful refresh, keeping the profile.
    pub fn install_tokens(
        &self,
        access: SecretString,
        refresh: Option<SecretString>,
    ) -> Result<(), SessionError> {
        {
            let mut inner = self.write();
            inner.access = Some(access);
            if refresh.is_some() {
                inner.refresh = refresh;
            }
            inner.generation += 1;
        }
        self.persist()?;
        self.publish(None);
        Ok(())
    }

    pub fn set_profile(&self, profile: UserProfile) -> Result<(), SessionError> {
        {
            let mut inner = self.write();
            inner.profile = Some(profile);
        }
        self.persist()?;
        self.publish(None);
        Ok(())
    }

    /// Wipe all credentials. `return_url` marks a forced logout and is
    /// surfaced to subscribers so a login surface can send the user
    /// back where they were.
    pub fn clear(&self, return_url: Option<String>) {
        {
            let mut inner = self.write();
            inner.access = None;
            inner.refresh = None;
            inner.profile = None;
            inner.generation += 1;
        }
        if let Some(path) = &self.file {
            if let Err(error) = fs::remove_file(path) {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "failed to remove persisted session"
                    );
                }
            }
        }
        self.publish(return_url);
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.read().access.clone()
    }

    pub fn access_token_with_generation(&self) -> (Option<SecretString>, u64) {
        let inner = self.read();
        (inner.access.clone(), inner.generation)
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().refresh.clone()
    }

    pub fn token_generation(&self) -> u64 {
        self.read().generation
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.read().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let inner = self.read();
        let Some(access) = &inner.access else {
            return Ok(());
        };

        let persisted = PersistedSession {
            access_token: access.expose_secret().to_string(),
            refresh_token: inner.refresh.as_ref().map(|token| token.expose_secret().to_string()),
            user: inner.profile.clone(),
        };
        drop(inner);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|source| SessionError::Write { path: path.clone(), source })?;
            }
        }

        let encoded = serde_json::to_vec_pretty(&persisted)?;
        fs::write(path, encoded)
            .map_err(|source| SessionError::Write { path: path.clone(), source })
    }

    fn publish(&self, return_url: Option<String>) {
        let inner = self.read();
        let snapshot = SessionSnapshot {
            authenticated: inner.access.is_some(),
            profile: inner.profile.clone(),
            return_url,
        };
        drop(inner);
        // Send failures only mean nobody is subscribed right now.
        let _ = self.changes.send(snapshot);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use uuid::Uuid;

    use operis_core::domain::user::{Role, UserId, UserProfile};

    use super::SessionStore;

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId(Uuid::new_v4()),
            email: "khach@operis.vn".to_string(),
            full_name: "Khách Hàng".to_string(),
            role: Role::Customer,
            is_active: true,
        }
    }

    #[test]
    fn login_then_logout_round_trip() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());

        store
            .install_login(
                SecretString::from("access-1".to_string()),
                Some(SecretString::from("refresh-1".to_string())),
                profile(),
            )
            .expect("in-memory install cannot fail");
        assert!(store.is_authenticated());
        assert_eq!(store.profile().map(|p| p.role), Some(Role::Customer));

        store.clear(None);
        assert!(!store.is_authenticated());
        assert!(store.profile().is_none());
    }

    #[test]
    fn generation_bumps_on_every_token_install() {
        let store = SessionStore::in_memory();
        let first = store.token_generation();

        store
            .install_login(SecretString::from("a".to_string()), None, profile())
            .expect("install");
        let second = store.token_generation();
        assert!(second > first);

        store
            .install_tokens(SecretString::from("b".to_string()), None)
            .expect("token swap");
        assert!(store.token_generation() > second);
    }

    #[test]
    fn subscribers_observe_forced_logout_with_return_url() {
        let store = SessionStore::in_memory();
        let mut changes = store.subscribe();

        store
            .install_login(SecretString::from("access".to_string()), None, profile())
            .expect("install");
        store.clear(Some("/proposals/123".to_string()));

        let snapshot = changes.borrow_and_update().clone();
        assert!(!snapshot.authenticated);
        assert_eq!(snapshot.return_url.as_deref(), Some("/proposals/123"));
    }

    #[test]
    fn persists_and_reloads_session_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session.json");

        let store = SessionStore::with_file(&path);
        store
            .install_login(
                SecretString::from("access-xyz".to_string()),
                Some(SecretString::from("refresh-xyz".to_string())),
                profile(),
            )
            .expect("persist should succeed");
        assert!(path.exists());

        let restored = SessionStore::with_file(&path);
        assert!(restored.load().expect("load should succeed"));
        assert!(restored.is_authenticated());
        assert_eq!(restored.profile().map(|p| p.email), Some("khach@operis.vn".to_string()));

        restored.clear(None);
        assert!(!path.exists());
    }

    #[test]
    fn load_tolerates_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::with_file(dir.path().join("absent.json"));
        assert!(!store.load().expect("missing file is not an error"));
    }
}
