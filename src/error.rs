//! # Client Errors
//!
//! Error types shared by every layer of the client. [`ClientError`] is `Clone`
//! because a single failure is handed to every waiter of a shared promise.

use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use std::fmt;

/// Errors surfaced by resource calls, the session manager and transports.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(HttpFailure),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Unknown action {model}.{action}")]
    UnknownAction { model: String, action: String },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Response channel closed")]
    Closed,
}

impl ClientError {
    /// HTTP status of the failure, if it came from (or imitates) a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(failure) => Some(failure.status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn as_http(&self) -> Option<&HttpFailure> {
        match self {
            ClientError::Http(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<StorageError> for ClientError {
    fn from(e: StorageError) -> Self {
        ClientError::Storage(e.to_string())
    }
}

/// A non-2xx outcome of a request.
///
/// `headers` is `None` only for failures synthesized locally (see
/// [`HttpFailure::stub_unauthorized`]); anything that went over a transport
/// carries the response headers, even when empty.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub headers: Option<HeaderMap>,
    pub body: Value,
}

impl HttpFailure {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Value) -> Self {
        Self {
            status,
            headers: Some(headers),
            body,
        }
    }

    /// 401 produced without contacting the backend.
    pub fn stub_unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            headers: None,
            body: json!({
                "error": {
                    "statusCode": 401,
                    "name": "Error",
                    "message": "Unauthorized",
                }
            }),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.headers.is_none()
    }

    /// Looks up a response header. Always `None` for stub failures.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|headers| headers.get(name))
            .and_then(|value| value.to_str().ok())
    }

    /// `error.message` from a LoopBack error body, when present.
    pub fn message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status.as_u16())?;
        if let Some(message) = self.message() {
            write!(f, ": {message}")?;
        }
        if self.is_stub() {
            write!(f, " (local)")?;
        }
        Ok(())
    }
}

/// Invalid model definitions, reported when a resource is created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("Invalid model name: {0:?}")]
    InvalidModelName(String),
    #[error("Model {model}: invalid action name {action:?}")]
    InvalidActionName { model: String, action: String },
    #[error("Model {model}: action {action} has invalid path {path:?}")]
    InvalidPath {
        model: String,
        action: String,
        path: String,
    },
    #[error("Model {model}: action {action} must return {expected}")]
    BuiltinShape {
        model: String,
        action: String,
        expected: &'static str,
    },
    #[error("Model registered twice: {0}")]
    DuplicateModel(String),
}

/// Failures while assembling a client registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("Invalid auth header name: {0:?}")]
    InvalidHeader(String),
    #[error("More than one user model: {0} and {1}")]
    MultipleUserModels(String, String),
}

/// Failures of a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_failure_has_no_headers() {
        let stub = HttpFailure::stub_unauthorized();
        assert!(stub.is_stub());
        assert_eq!(stub.header("content-type"), None);
        assert!(ClientError::Http(stub).is_unauthorized());
    }

    #[test]
    fn display_includes_server_message() {
        let failure = HttpFailure::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            json!({"error": {"statusCode": 404, "message": "Unknown \"MyModel\" id \"7\"."}}),
        );
        assert_eq!(failure.to_string(), "HTTP 404: Unknown \"MyModel\" id \"7\".");
        assert!(!failure.is_stub());
    }
}
