use std::sync::Arc;

use super::{KeyValueStore, StoreKey};
use crate::{
    error::{ClientError, ClientResult},
    models::{AccessToken, Session, User},
};

/// Persists and restores the authenticated session.
///
/// Token and user are written and removed together. A store holding only one of
/// them (or an unreadable user record) restores as signed out and is cleaned up.
/// Persistence failures are logged, never propagated: losing the saved session
/// only costs the user a login on next start.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Reads the saved session, if a complete one exists
    pub fn restore(&self) -> Option<Session> {
        match self.read_session() {
            Ok(Some(session)) => {
                tracing::info!(user_id = session.user.id, "Restored saved session");
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Saved session unreadable, signing out");
                self.clear();
                None
            }
        }
    }

    fn read_session(&self) -> ClientResult<Option<Session>> {
        let token = self.backend.get(&StoreKey::Token.to_string())?;
        let user = self.backend.get(&StoreKey::User.to_string())?;

        match (token, user) {
            (Some(token), Some(user)) => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(Session {
                    token: AccessToken::new(token),
                    user,
                }))
            }
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("Saved session is incomplete, discarding");
                self.clear();
                Ok(None)
            }
        }
    }

    /// Saves token and user
    pub fn persist(&self, session: &Session) {
        if let Err(e) = self.write_session(session) {
            tracing::warn!(error = %e, user_id = session.user.id, "Failed to persist session");
        }
    }

    fn write_session(&self, session: &Session) -> ClientResult<()> {
        let user = serde_json::to_string(&session.user)?;
        self.backend
            .set(&StoreKey::Token.to_string(), session.token.as_str())?;
        self.backend.set(&StoreKey::User.to_string(), &user)?;
        Ok(())
    }

    /// Saves an updated user record for the current session
    pub fn persist_user(&self, user: &User) {
        let result = serde_json::to_string(user)
            .map_err(ClientError::from)
            .and_then(|json| self.backend.set(&StoreKey::User.to_string(), &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, user_id = user.id, "Failed to persist user");
        }
    }

    /// Removes token and user
    pub fn clear(&self) {
        for key in [StoreKey::Token, StoreKey::User] {
            if let Err(e) = self.backend.remove(&key.to_string()) {
                tracing::warn!(error = %e, key = %key, "Failed to clear saved session");
            }
        }
    }

    pub fn dark_mode(&self) -> bool {
        match self.backend.get(&StoreKey::DarkMode.to_string()) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read display preference");
                false
            }
        }
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        let value = if enabled { "true" } else { "false" };
        if let Err(e) = self.backend.set(&StoreKey::DarkMode.to_string(), value) {
            tracing::warn!(error = %e, "Failed to persist display preference");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn session() -> Session {
        Session {
            token: AccessToken::new("T1"),
            user: serde_json::from_value(json!({"id": 7, "name": "Ann"})).unwrap(),
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> ClientResult<Option<String>> {
            Err(ClientError::Storage(std::io::Error::other("disk gone")))
        }

        fn set(&self, _key: &str, _value: &str) -> ClientResult<()> {
            Err(ClientError::Storage(std::io::Error::other("disk gone")))
        }

        fn remove(&self, _key: &str) -> ClientResult<()> {
            Err(ClientError::Storage(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn test_persist_then_restore() {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());

        store.persist(&session());
        assert_eq!(backend.get("token").unwrap(), Some("T1".to_string()));

        let restored = store.restore().unwrap();
        assert_eq!(restored, session());
    }

    #[test]
    fn test_restore_empty_store() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(store.restore().is_none());
    }

    #[test]
    fn test_restore_token_without_user_clears_both() {
        let backend = Arc::new(MemoryStore::with_entries([("token", "T1")]));
        let store = SessionStore::new(backend.clone());

        assert!(store.restore().is_none());
        assert_eq!(backend.get("token").unwrap(), None);
    }

    #[test]
    fn test_restore_corrupt_user_clears_both() {
        let backend = Arc::new(MemoryStore::with_entries([
            ("token", "T1"),
            ("user", "{not json"),
        ]));
        let store = SessionStore::new(backend.clone());

        assert!(store.restore().is_none());
        assert_eq!(backend.get("token").unwrap(), None);
        assert_eq!(backend.get("user").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_session_but_keeps_dark_mode() {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());
        store.persist(&session());
        store.set_dark_mode(true);

        store.clear();
        assert!(store.restore().is_none());
        assert!(store.dark_mode());
    }

    #[test]
    fn test_dark_mode_round_trip() {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());
        assert!(!store.dark_mode());

        store.set_dark_mode(true);
        assert_eq!(backend.get("darkMode").unwrap(), Some("true".to_string()));
        assert!(store.dark_mode());

        store.set_dark_mode(false);
        assert!(!store.dark_mode());
    }

    #[test]
    fn test_failing_backend_never_panics() {
        let store = SessionStore::new(Arc::new(FailingStore));
        store.persist(&session());
        store.persist_user(&session().user);
        store.set_dark_mode(true);
        store.clear();
        assert!(store.restore().is_none());
        assert!(!store.dark_mode());
    }
}
