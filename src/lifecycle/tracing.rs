//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! Log levels come from the `RUST_LOG` environment variable.
//!
//! ## What Gets Traced
//!
//! - **Registry**: models registered, session restored at startup
//! - **Session transitions**: login, logout, 401 invalidation (`info`)
//! - **Requests**: model, action, method and URI of every call (`debug`)
//! - **Swallowed failures**: storage errors while clearing, failed logout calls,
//!   malformed persisted sessions (`warn`)
//!
//! ## Usage Examples
//!
//! ```bash
//! # Session transitions only
//! RUST_LOG=info cargo run
//!
//! # Every request, with the span of the client call that issued it
//! RUST_LOG=debug cargo run
//!
//! # Only the auth layer
//! RUST_LOG=lb_client::auth=debug cargo run
//! ```
//!
//! ## Output
//!
//! **With `RUST_LOG=info`** (compact):
//!
//! ```text
//! INFO Client registry built models=2 authenticated=false
//! INFO Session established user_id="1" kind=Durable
//! INFO login{model="User"}: Logged in user_id="1" remember_me=true
//! INFO Logged out
//! ```
//!
//! The compact format shows span hierarchy inline, so a request logged inside
//! `UserClient::login` is prefixed with `login{model="User"}:`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Module paths add nothing; model and action are fields
        .compact() // Compact format shows spans inline (e.g., "login{model=\"User\"}")
        .init();
}
