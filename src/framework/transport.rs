//! # Transport Seam
//!
//! Everything that performs a request implements [`Transport`]: the HTTP
//! transport, the in-process backend client, the mock used in tests, and the
//! auth interceptor that decorates any of them.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

use crate::error::{ClientError, HttpFailure};

/// An outgoing request. Query values are kept unencoded until [`Request::uri`].
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Path plus percent-encoded query string.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `Ok(self)` for 2xx, otherwise the failure the caller should see.
    pub fn into_result(self) -> Result<Response, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Http(HttpFailure::new(
                self.status,
                self.headers,
                self.body,
            )))
        }
    }
}

/// Sends requests to a backend.
///
/// Implementations may report a non-2xx status either as `Ok(Response)` or as
/// `Err(ClientError::Http)`; callers normalize with [`Response::into_result`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uri_encodes_query_values() {
        let request = Request::new(Method::GET, "/MyModels").with_query(vec![(
            "filter".to_string(),
            r#"{"where":{"name":"a b"}}"#.to_string(),
        )]);
        assert_eq!(
            request.uri(),
            "/MyModels?filter=%7B%22where%22%3A%7B%22name%22%3A%22a%20b%22%7D%7D"
        );
    }

    #[test]
    fn into_result_maps_non_success() {
        let failure = Response::new(StatusCode::UNAUTHORIZED, json!(null))
            .into_result()
            .unwrap_err();
        assert!(failure.is_unauthorized());
        assert!(!failure.as_http().unwrap().is_stub());
        assert!(Response::ok(json!([])).into_result().is_ok());
    }
}
