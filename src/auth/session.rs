//! # Auth Session Manager
//!
//! [`AuthSession`] owns the `{accessTokenId, currentUserId}` pair, decides
//! where it is persisted, and clears it (together with the current-user cache)
//! on logout or when the server rejects the token.
//!
//! The pair is stored as one [`ActiveToken`] behind one lock and persisted as
//! one JSON record, so the two ids are never observed half-set.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::current_user::CurrentUserCache;
use super::storage::{SessionStores, StorageKind};
use crate::error::ClientError;
use crate::model::Entity;

/// Default key of the persisted session record.
pub const DEFAULT_STORAGE_KEY: &str = "$LoopBack$session";

/// Persisted form of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub access_token_id: Option<String>,
    pub current_user_id: Option<String>,
}

impl SessionRecord {
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn active(&self) -> Option<ActiveToken> {
        match (&self.access_token_id, &self.current_user_id) {
            (Some(id), Some(user_id)) => Some(ActiveToken {
                id: id.clone(),
                user_id: user_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Access token returned by the login action.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub id: String,
    pub user_id: String,
    /// Present when the login was made with `include=user`.
    pub user: Option<Entity>,
}

impl AccessToken {
    /// Reads `{id, userId, user?}` from a login response body.
    pub fn from_response(body: &Value) -> Result<Self, ClientError> {
        let id = body
            .get("id")
            .and_then(id_to_string)
            .ok_or_else(|| ClientError::Decode("login response has no token id".into()))?;
        let user_id = body
            .get("userId")
            .and_then(id_to_string)
            .ok_or_else(|| ClientError::Decode("login response has no userId".into()))?;
        let user = body.get("user").and_then(Value::as_object).cloned();
        Ok(Self { id, user_id, user })
    }
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveToken {
    id: String,
    user_id: String,
}

#[derive(Debug)]
struct SessionState {
    token: Option<ActiveToken>,
    remember_me: bool,
}

/// The session of one client instance.
#[derive(Debug)]
pub struct AuthSession {
    stores: SessionStores,
    storage_key: String,
    state: RwLock<SessionState>,
    current_user: CurrentUserCache,
}

impl AuthSession {
    /// Restores the session from storage: durable backend first, then ephemeral.
    pub fn restore(stores: SessionStores, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let mut token = None;
        let mut remember_me = true;
        for kind in [StorageKind::Durable, StorageKind::Ephemeral] {
            if let Some(found) = Self::load(&stores, kind, &storage_key) {
                info!(?kind, user_id = %found.user_id, "Session restored");
                token = Some(found);
                remember_me = kind.remember_me();
                break;
            }
        }
        Self {
            stores,
            storage_key,
            state: RwLock::new(SessionState { token, remember_me }),
            current_user: CurrentUserCache::new(),
        }
    }

    fn load(stores: &SessionStores, kind: StorageKind, key: &str) -> Option<ActiveToken> {
        let raw = match stores.get(kind).get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(?kind, error = %e, "Reading session failed");
                return None;
            }
        };
        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => {
                let active = record.active();
                if active.is_none() {
                    warn!(?kind, "Ignoring incomplete session record");
                }
                active
            }
            Err(e) => {
                warn!(?kind, error = %e, "Ignoring malformed session record");
                None
            }
        }
    }

    pub fn access_token_id(&self) -> Option<String> {
        self.state.read().token.as_ref().map(|t| t.id.clone())
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.state.read().token.as_ref().map(|t| t.user_id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    pub fn remember_me(&self) -> bool {
        self.state.read().remember_me
    }

    /// In-memory record; both fields are set or both are `None`.
    pub fn record(&self) -> SessionRecord {
        match &self.state.read().token {
            Some(token) => SessionRecord {
                access_token_id: Some(token.id.clone()),
                current_user_id: Some(token.user_id.clone()),
            },
            None => SessionRecord::anonymous(),
        }
    }

    pub fn current_user(&self) -> &CurrentUserCache {
        &self.current_user
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Makes `token` the active session and persists it in `kind`.
    ///
    /// The record is written before memory is updated; if the write fails
    /// the previous state is kept.
    pub fn establish(&self, token: AccessToken, kind: StorageKind) -> Result<(), ClientError> {
        let active = ActiveToken {
            id: token.id,
            user_id: token.user_id,
        };
        let record = SessionRecord {
            access_token_id: Some(active.id.clone()),
            current_user_id: Some(active.user_id.clone()),
        };
        let raw = serde_json::to_string(&record)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.stores.get(kind).set(&self.storage_key, &raw)?;
        if let Err(e) = self.stores.get(kind.other()).remove(&self.storage_key) {
            warn!(kind = ?kind.other(), error = %e, "Clearing stale session failed");
        }

        let user_id = active.user_id.clone();
        {
            let mut state = self.state.write();
            state.token = Some(active);
            state.remember_me = kind.remember_me();
        }
        match token.user {
            Some(user) => self.current_user.seed(user_id.clone(), user),
            None => self.current_user.invalidate(),
        }
        info!(%user_id, ?kind, "Session established");
        Ok(())
    }

    /// Returns to Anonymous: memory, both backends and the current-user cache.
    pub fn clear(&self) {
        self.state.write().token = None;
        self.current_user.invalidate();
        for kind in [StorageKind::Durable, StorageKind::Ephemeral] {
            if let Err(e) = self.stores.get(kind).remove(&self.storage_key) {
                warn!(?kind, error = %e, "Clearing persisted session failed");
            }
        }
        debug!("Session cleared");
    }

    /// Clears the session after the server rejected the token with 401.
    pub fn invalidate(&self) {
        if self.is_authenticated() {
            info!("Session invalidated by 401 response");
        }
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(id: &str, user_id: &str) -> AccessToken {
        AccessToken {
            id: id.into(),
            user_id: user_id.into(),
            user: None,
        }
    }

    fn stored(stores: &SessionStores, kind: StorageKind) -> Option<SessionRecord> {
        stores
            .get(kind)
            .get(DEFAULT_STORAGE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn starts_anonymous_without_persisted_record() {
        let session = AuthSession::restore(SessionStores::in_memory(), DEFAULT_STORAGE_KEY);
        assert!(!session.is_authenticated());
        assert_eq!(session.record(), SessionRecord::anonymous());
    }

    #[test]
    fn establish_persists_in_selected_backend_only() {
        let stores = SessionStores::in_memory();
        let session = AuthSession::restore(stores.clone(), DEFAULT_STORAGE_KEY);

        session.establish(token("t1", "1"), StorageKind::Durable).unwrap();
        assert!(stored(&stores, StorageKind::Durable).is_some());
        assert!(stored(&stores, StorageKind::Ephemeral).is_none());

        session.establish(token("t2", "1"), StorageKind::Ephemeral).unwrap();
        assert!(stored(&stores, StorageKind::Durable).is_none());
        assert_eq!(
            stored(&stores, StorageKind::Ephemeral).unwrap().access_token_id.as_deref(),
            Some("t2")
        );
        assert!(!session.remember_me());
    }

    #[test]
    fn restore_prefers_durable_backend() {
        let stores = SessionStores::in_memory();
        let durable = serde_json::to_string(&SessionRecord {
            access_token_id: Some("durable".into()),
            current_user_id: Some("1".into()),
        })
        .unwrap();
        let ephemeral = serde_json::to_string(&SessionRecord {
            access_token_id: Some("ephemeral".into()),
            current_user_id: Some("2".into()),
        })
        .unwrap();
        stores.durable().set(DEFAULT_STORAGE_KEY, &durable).unwrap();
        stores.ephemeral().set(DEFAULT_STORAGE_KEY, &ephemeral).unwrap();

        let session = AuthSession::restore(stores.clone(), DEFAULT_STORAGE_KEY);
        assert_eq!(session.access_token_id().as_deref(), Some("durable"));
        assert!(session.remember_me());

        stores.durable().clear().unwrap();
        let session = AuthSession::restore(stores, DEFAULT_STORAGE_KEY);
        assert_eq!(session.access_token_id().as_deref(), Some("ephemeral"));
        assert_eq!(session.current_user_id().as_deref(), Some("2"));
        assert!(!session.remember_me());
    }

    #[test]
    fn half_populated_or_malformed_records_are_ignored() {
        let stores = SessionStores::in_memory();
        stores
            .durable()
            .set(DEFAULT_STORAGE_KEY, r#"{"accessTokenId":"t","currentUserId":null}"#)
            .unwrap();
        stores.ephemeral().set(DEFAULT_STORAGE_KEY, "not json").unwrap();
        let session = AuthSession::restore(stores, DEFAULT_STORAGE_KEY);
        assert!(!session.is_authenticated());
        assert_eq!(session.record(), SessionRecord::anonymous());
    }

    #[test]
    fn clear_wipes_memory_storage_and_current_user() {
        let stores = SessionStores::in_memory();
        let session = AuthSession::restore(stores.clone(), DEFAULT_STORAGE_KEY);
        let mut login = token("t1", "1");
        login.user = json!({"id": 1, "email": "a@example.com"}).as_object().cloned();
        session.establish(login, StorageKind::Durable).unwrap();
        assert!(session.current_user().current().is_some());

        session.clear();
        assert_eq!(session.record(), SessionRecord::anonymous());
        assert!(session.current_user().current().is_none());
        assert!(stored(&stores, StorageKind::Durable).is_none());
        assert!(stored(&stores, StorageKind::Ephemeral).is_none());

        let reloaded = AuthSession::restore(stores, DEFAULT_STORAGE_KEY);
        assert!(!reloaded.is_authenticated());
    }

    #[test]
    fn access_token_reads_numeric_user_id() {
        let body = json!({"id": "abc", "ttl": 1209600, "userId": 4});
        let token = AccessToken::from_response(&body).unwrap();
        assert_eq!(token.user_id, "4");
        assert!(token.user.is_none());
        assert!(AccessToken::from_response(&json!({"id": "abc"})).is_err());
    }
}
