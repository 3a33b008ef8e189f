use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::auth::{AuthSession, REMEMBER_ME_PARAM};
use crate::clients::model_client::ModelClient;
use crate::framework::{Callbacks, Instance, Promise, ResourceHandle};
use crate::model::{Entity, Params};

/// Options of [`UserClient::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Durable storage when `true`, ephemeral otherwise.
    pub remember_me: bool,
    /// Relation embedded in the token response; `None` omits the parameter.
    pub include: Option<String>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            remember_me: true,
            include: Some("user".into()),
        }
    }
}

impl LoginOptions {
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    pub fn include(mut self, include: Option<&str>) -> Self {
        self.include = include.map(str::to_string);
        self
    }
}

/// Client for the authentication model (base `User`).
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceHandle,
    session: Arc<AuthSession>,
}

impl ModelClient for UserClient {
    fn inner(&self) -> &ResourceHandle {
        &self.inner
    }
}

impl UserClient {
    pub fn new(inner: ResourceHandle) -> Self {
        let session = Arc::clone(inner.session());
        Self { inner, session }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Logs in with `{email, password}`.
    ///
    /// The session is established before the returned instance resolves, so
    /// anything awaiting it already sees the new token.
    #[instrument(skip(self, credentials), fields(model = %self.inner.name()))]
    pub fn login(&self, credentials: Entity, options: LoginOptions) -> Instance {
        let mut params = Params::new().with(REMEMBER_ME_PARAM, options.remember_me);
        if let Some(include) = &options.include {
            params.insert("include", include.clone());
        }
        debug!("Sending request");
        self.inner.call_one_with(
            "login",
            params,
            Some(Value::Object(credentials)),
            Callbacks::none(),
        )
    }

    /// Ends the session on the server and locally.
    ///
    /// Local state is cleared whatever the server answers; the handle's
    /// [`LogoutPolicy`](crate::lifecycle::LogoutPolicy) decides whether a
    /// failed call is reported.
    #[instrument(skip(self), fields(model = %self.inner.name()))]
    pub fn logout(&self) -> Instance {
        debug!("Sending request");
        self.inner
            .call_one_with("logout", Params::new(), None, Callbacks::none())
    }

    /// Fetches the user of the active session. Fails locally with a stub 401
    /// when there is none.
    #[instrument(skip(self), fields(model = %self.inner.name()))]
    pub fn get_current(&self) -> Instance {
        debug!("Sending request");
        self.inner
            .call_one_with("getCurrent", Params::new(), None, Callbacks::none())
    }

    /// `$currentUser`: the cached user, `None` until resolved.
    pub fn current_user(&self) -> Option<Entity> {
        self.session.current_user().current()
    }

    /// `$ensureCurrentUser()`: resolves the current user at most once per
    /// session, sharing the request between concurrent callers.
    pub fn ensure_current_user(&self) -> Promise<Entity> {
        let client = self.clone();
        self.session
            .current_user()
            .ensure(self.session.current_user_id(), move || {
                client.get_current().promise().boxed()
            })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

impl std::fmt::Debug for UserClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserClient")
            .field("model", &self.inner.name())
            .field("logout_policy", &self.inner.logout_policy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionStores, DEFAULT_STORAGE_KEY};
    use crate::error::ClientError;
    use crate::framework::create_resource;
    use crate::lifecycle::LogoutPolicy;
    use crate::framework::mock::MockTransport;
    use crate::model::{ModelDefinition, USER_BASE};
    use http::{Method, StatusCode};
    use serde_json::json;

    fn client(mock: &MockTransport, policy: LogoutPolicy) -> (UserClient, SessionStores) {
        let stores = SessionStores::in_memory();
        let session = Arc::new(AuthSession::restore(stores.clone(), DEFAULT_STORAGE_KEY));
        let handle = create_resource(
            ModelDefinition::new("user").base(USER_BASE),
            Arc::new(mock.clone()),
            session,
        )
        .unwrap()
        .with_logout_policy(policy);
        (UserClient::new(handle), stores)
    }

    fn credentials() -> Entity {
        json!({"email": "a@example.com", "password": "secret"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn login_establishes_session_before_resolving() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/users/login").respond(
            StatusCode::OK,
            json!({"id": "tok", "ttl": 1209600, "userId": 1, "user": {"id": 1, "email": "a@example.com"}}),
        );
        let (users, _) = client(&mock, LogoutPolicy::Swallow);

        let token = users.login(credentials(), LoginOptions::default());
        let body = token.promise().await.unwrap();
        assert_eq!(body["id"], "tok");
        assert!(body.get("password").is_none());
        assert_eq!(users.session().access_token_id().as_deref(), Some("tok"));
        assert_eq!(users.current_user().unwrap()["email"], "a@example.com");
        assert_eq!(mock.requests()[0].query_param("include"), Some("user"));
        assert_eq!(mock.requests()[0].query_param(REMEMBER_ME_PARAM), None);
    }

    #[tokio::test]
    async fn failed_login_keeps_anonymous_state() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/users/login").respond(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"statusCode": 401, "message": "login failed"}}),
        );
        let (users, _) = client(&mock, LogoutPolicy::Swallow);
        let err = users
            .login(credentials(), LoginOptions::default().include(None))
            .promise()
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!users.is_authenticated());
        assert_eq!(mock.requests()[0].query_param("include"), None);
    }

    #[tokio::test]
    async fn logout_clears_even_when_the_call_fails() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/users/login")
            .respond(StatusCode::OK, json!({"id": "tok", "userId": 1}));
        mock.expect(Method::POST, "/users/logout")
            .fail(ClientError::Transport("offline".into()));
        let (users, stores) = client(&mock, LogoutPolicy::Swallow);

        users
            .login(credentials(), LoginOptions::default())
            .promise()
            .await
            .unwrap();
        users.logout().promise().await.unwrap();
        assert!(!users.is_authenticated());
        assert!(stores.durable().get(DEFAULT_STORAGE_KEY).unwrap().is_none());
        assert!(users.current_user().is_none());
    }

    #[tokio::test]
    async fn propagate_policy_reports_logout_failure() {
        let mock = MockTransport::new();
        mock.expect(Method::POST, "/users/login")
            .respond(StatusCode::OK, json!({"id": "tok", "userId": 1}));
        mock.expect(Method::POST, "/users/logout")
            .respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": {"message": "boom"}}));
        let (users, _) = client(&mock, LogoutPolicy::Propagate);

        users
            .login(credentials(), LoginOptions::default())
            .promise()
            .await
            .unwrap();
        assert!(users.logout().promise().await.is_err());
        assert!(!users.is_authenticated());
    }
}
