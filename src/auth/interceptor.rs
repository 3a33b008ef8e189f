//! # Request Interceptor
//!
//! [`AuthInterceptor`] decorates the transport every resource uses. Outgoing
//! requests get the access token header while a session exists; a 401 from
//! the server clears the session before the failure is handed back, so no
//! caller can observe the rejection while stale credentials are still live.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};
use tracing::{debug, warn};

use super::session::AuthSession;
use crate::error::ClientError;
use crate::framework::transport::{Request, Response, Transport};

/// Default name of the header carrying the access token.
pub const DEFAULT_AUTH_HEADER: &str = "authorization";

pub struct AuthInterceptor {
    inner: Arc<dyn Transport>,
    session: Arc<AuthSession>,
    header: HeaderName,
}

impl AuthInterceptor {
    pub fn new(inner: Arc<dyn Transport>, session: Arc<AuthSession>, header: HeaderName) -> Self {
        Self {
            inner,
            session,
            header,
        }
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }

    fn attach_token(&self, request: &mut Request) {
        let Some(token) = self.session.access_token_id() else {
            return;
        };
        match HeaderValue::from_str(&token) {
            Ok(value) => {
                request.headers.insert(self.header.clone(), value);
            }
            Err(e) => warn!(error = %e, "Access token is not a valid header value"),
        }
    }
}

#[async_trait]
impl Transport for AuthInterceptor {
    async fn send(&self, mut request: Request) -> Result<Response, ClientError> {
        self.attach_token(&mut request);
        let method = request.method.clone();
        let uri = request.uri();

        let result = self
            .inner
            .send(request)
            .await
            .and_then(Response::into_result);

        if let Err(error) = &result {
            let from_server = error.as_http().is_some_and(|failure| !failure.is_stub());
            if error.is_unauthorized() && from_server {
                debug!(%method, %uri, "Server rejected credentials");
                self.session.invalidate();
            }
        }
        result
    }
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{AccessToken, DEFAULT_STORAGE_KEY};
    use crate::auth::storage::{SessionStores, StorageKind};
    use http::{Method, StatusCode};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records requests and answers each with a fixed status.
    struct Recorder {
        status: StatusCode,
        seen: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: Request) -> Result<Response, ClientError> {
            self.seen.lock().push(request);
            Ok(Response::new(self.status, json!({})))
        }
    }

    fn setup(status: StatusCode) -> (Arc<Recorder>, Arc<AuthSession>, AuthInterceptor) {
        let recorder = Arc::new(Recorder {
            status,
            seen: Mutex::new(Vec::new()),
        });
        let session = Arc::new(AuthSession::restore(
            SessionStores::in_memory(),
            DEFAULT_STORAGE_KEY,
        ));
        let interceptor = AuthInterceptor::new(
            recorder.clone(),
            session.clone(),
            HeaderName::from_static(DEFAULT_AUTH_HEADER),
        );
        (recorder, session, interceptor)
    }

    fn login(session: &AuthSession) {
        session
            .establish(
                AccessToken {
                    id: "token-1".into(),
                    user_id: "1".into(),
                    user: None,
                },
                StorageKind::Durable,
            )
            .unwrap();
    }

    #[tokio::test]
    async fn attaches_token_only_while_authenticated() {
        let (recorder, session, interceptor) = setup(StatusCode::OK);
        interceptor
            .send(Request::new(Method::GET, "/MyModels"))
            .await
            .unwrap();
        login(&session);
        interceptor
            .send(Request::new(Method::GET, "/MyModels"))
            .await
            .unwrap();

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].header(DEFAULT_AUTH_HEADER), None);
        assert_eq!(seen[1].header(DEFAULT_AUTH_HEADER), Some("token-1"));
    }

    #[tokio::test]
    async fn unauthorized_response_clears_session_before_returning() {
        let (_, session, interceptor) = setup(StatusCode::UNAUTHORIZED);
        login(&session);

        let err = interceptor
            .send(Request::new(Method::GET, "/MyModels"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token_id(), None);
    }

    #[tokio::test]
    async fn other_failures_keep_the_session() {
        let (_, session, interceptor) = setup(StatusCode::FORBIDDEN);
        login(&session);
        let err = interceptor
            .send(Request::new(Method::GET, "/MyModels"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(session.is_authenticated());
    }
}
