//! In-memory LoopBack-style server used by the demo binary and the
//! integration tests.

pub mod actor;

pub use actor::{spawn, BackendActor, BackendClient, BackendConfig, BackendModel, TOKEN_TTL};
