//! # Mock Transport
//!
//! Scripted [`Transport`] for testing resources without a backend.
//!
//! Register expectations in the order the requests will be made, run the code
//! under test, then call [`MockTransport::verify`] to make sure every
//! expectation was consumed.
//!
//! # Example
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect(Method::GET, "/MyModels").respond(StatusCode::OK, json!([]));
//!
//! let models = create_resource(ModelDefinition::new("MyModel"), Arc::new(mock.clone()), session)?;
//! models.query(Params::new()).promise().await?;
//! mock.verify();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;

use super::transport::{Request, Response, Transport};
use crate::error::ClientError;

/// One scripted request/response pair.
struct Expectation {
    method: Method,
    path: String,
    response: Result<Response, ClientError>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    requests: Vec<Request>,
}

/// A transport that answers from a queue of expectations. Cheap to clone;
/// clones share the queue and the request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next request to be `method path` (query string ignored).
    pub fn expect(&self, method: Method, path: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            path: path.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Panics if any expectation was not consumed.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            let pending: Vec<String> = state
                .expectations
                .iter()
                .map(|e| format!("{} {}", e.method, e.path))
                .collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                pending.len(),
                pending
            );
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        let Some(expectation) = state.expectations.pop_front() else {
            return Err(ClientError::Transport(format!(
                "unexpected request {} {}",
                request.method,
                request.uri()
            )));
        };
        if expectation.method != request.method || expectation.path != request.path {
            return Err(ClientError::Transport(format!(
                "expected {} {}, got {} {}",
                expectation.method, expectation.path, request.method, request.path
            )));
        }
        expectation.response
    }
}

/// Builder returned by [`MockTransport::expect`].
pub struct ExpectationBuilder {
    method: Method,
    path: String,
    state: Arc<Mutex<MockState>>,
}

impl ExpectationBuilder {
    /// Answers with `status` and a JSON body. Error statuses carry a JSON
    /// content type so they look like a real server response.
    pub fn respond(self, status: StatusCode, body: Value) {
        let response = Response::new(status, body).with_header(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        self.push(Ok(response));
    }

    /// Fails at the transport level, as if the network were down.
    pub fn fail(self, error: ClientError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Response, ClientError>) {
        self.state.lock().expectations.push_back(Expectation {
            method: self.method,
            path: self.path,
            response,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn answers_in_order_and_logs_requests() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels").respond(StatusCode::OK, json!([]));
        mock.expect(Method::POST, "/MyModels")
            .fail(ClientError::Transport("offline".into()));

        let first = mock.send(Request::new(Method::GET, "/MyModels")).await.unwrap();
        assert_eq!(first.body, json!([]));
        let second = mock.send(Request::new(Method::POST, "/MyModels")).await;
        assert!(matches!(second, Err(ClientError::Transport(_))));

        assert_eq!(mock.requests().len(), 2);
        mock.verify();
    }

    #[tokio::test]
    async fn unexpected_request_is_an_error() {
        let mock = MockTransport::new();
        let result = mock.send(Request::new(Method::GET, "/Other")).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect(Method::GET, "/MyModels").respond(StatusCode::OK, json!([]));
        mock.verify();
    }
}
