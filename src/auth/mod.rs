//! Session state, its persistence, and the transport decorator that keeps
//! them in sync with the server.
//!
//! - [`AuthSession`] - token + user id, login/logout/401 transitions
//! - [`CurrentUserCache`] - `$currentUser` with one shared in-flight request
//! - [`AuthInterceptor`] - attaches the token, clears the session on 401
//! - [`actions`] - session updates attached to `login`/`logout` calls
//! - [`storage`] - durable and ephemeral backends

pub mod actions;
pub mod current_user;
pub mod interceptor;
pub mod session;
pub mod storage;

pub use actions::REMEMBER_ME_PARAM;
pub use current_user::CurrentUserCache;
pub use interceptor::{AuthInterceptor, DEFAULT_AUTH_HEADER};
pub use session::{AccessToken, AuthSession, SessionRecord, DEFAULT_STORAGE_KEY};
pub use storage::{FileStorage, MemoryStorage, SessionStores, Storage, StorageKind};
