//! Client configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::{DEFAULT_AUTH_HEADER, DEFAULT_STORAGE_KEY};

/// What `logout()` reports when the backend call fails.
///
/// Local session state is cleared in both cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogoutPolicy {
    /// Log the failure and resolve successfully.
    #[default]
    Swallow,
    /// Reject with the backend's error.
    Propagate,
}

impl FromStr for LogoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swallow" => Ok(LogoutPolicy::Swallow),
            "propagate" => Ok(LogoutPolicy::Propagate),
            other => Err(format!("unknown logout policy {other:?}")),
        }
    }
}

/// Configuration of one client registry.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// REST root of a remote backend; `None` selects the in-process backend.
    pub base_url: Option<String>,
    /// Header that carries the access token.
    pub auth_header: String,
    /// Key of the persisted session record.
    pub storage_key: String,
    /// File backing the durable session store; in memory when `None`.
    pub session_file: Option<PathBuf>,
    pub logout_errors: LogoutPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_header: DEFAULT_AUTH_HEADER.into(),
            storage_key: DEFAULT_STORAGE_KEY.into(),
            session_file: None,
            logout_errors: LogoutPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable           | Default                |
    /// |--------------------|------------------------|
    /// | `LB_BASE_URL`      | unset (in-process)     |
    /// | `LB_AUTH_HEADER`   | `authorization`        |
    /// | `LB_STORAGE_KEY`   | `$LoopBack$session`    |
    /// | `LB_SESSION_FILE`  | unset (memory)         |
    /// | `LB_LOGOUT_ERRORS` | `swallow`              |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let logout_errors = match non_empty("LB_LOGOUT_ERRORS") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Ignoring LB_LOGOUT_ERRORS");
                defaults.logout_errors
            }),
            None => defaults.logout_errors,
        };
        Self {
            base_url: non_empty("LB_BASE_URL"),
            auth_header: non_empty("LB_AUTH_HEADER").unwrap_or(defaults.auth_header),
            storage_key: non_empty("LB_STORAGE_KEY").unwrap_or(defaults.storage_key),
            session_file: non_empty("LB_SESSION_FILE").map(PathBuf::from),
            logout_errors,
        }
    }
}
