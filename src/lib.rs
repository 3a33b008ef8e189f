//! # LoopBack Client Runtime
//!
//! > **Generated REST resources with an authenticated session, on Tokio.**
//!
//! This crate is the runtime behind a generated LoopBack client. From a set of
//! model definitions it builds callable resources (CRUD plus custom actions),
//! and it manages the session that authenticates them: the access token, the
//! current user, persistence across restarts, and invalidation on logout or
//! on a 401 from the server.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why containers instead of plain futures?
//!
//! Every action returns a container *immediately*: an [`Instance`](framework::Instance)
//! or a [`Collection`](framework::Collection). The container holds a value that
//! is filled in when the request settles, plus a shared promise any number of
//! callers can await. The request runs in its own task, so it completes even
//! if nobody awaits it.
//!
//! ### Why an explicit session object?
//!
//! The token, the user id, and the cached user all live in one
//! [`AuthSession`](auth::AuthSession) per registry. It is handed explicitly to
//! the resource factory and to the interceptor, so two registries never share
//! credentials by accident.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! [`ClientError`](error::ClientError) is `Clone` because one failure reaches
//! every waiter of a shared promise. HTTP failures keep the status, the
//! response headers and the LoopBack error body; failures synthesized locally
//! have no headers (see [`HttpFailure::is_stub`](error::HttpFailure::is_stub)).
//!
//! ### 2. 401 Ordering
//! The [`AuthInterceptor`](auth::AuthInterceptor) sits inside the transport
//! chain. It clears the session *before* the failure is published to the
//! container, so an error handler always sees the anonymous state.
//!
//! ### 3. Concurrency Model
//! Shared state uses `parking_lot` locks held for short synchronous sections,
//! never across an `.await`. The in-process backend is an actor and needs no
//! locks at all.
//!
//! ### 4. Observability
//! We use `tracing` everywhere with structured logging.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! - **Role**: Turns a [`ModelDefinition`](model::ModelDefinition) into a
//!   [`ResourceHandle`](framework::ResourceHandle) and drives each call.
//! - **Key items**: [`create_resource`](framework::create_resource),
//!   [`ResultContainer`](framework::ResultContainer), [`Transport`](framework::Transport).
//!
//! ### 2. The Session ([`auth`])
//! - **Role**: Login/logout/401 transitions, remember-me storage selection,
//!   `$currentUser` caching, token injection.
//! - **Key items**: [`AuthSession`](auth::AuthSession),
//!   [`CurrentUserCache`](auth::CurrentUserCache), [`AuthInterceptor`](auth::AuthInterceptor).
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: The per-application registry that restores the session and wires
//!   every resource to the interceptor.
//! - **Key items**: [`Services`](lifecycle::Services), [`ClientConfig`](lifecycle::ClientConfig).
//!
//! ### 4. The Interface ([`clients`])
//! - **Role**: Typed wrappers; the user model gets `login`, `logout` and
//!   `ensure_current_user`.
//! - **Key items**: [`UserClient`](clients::UserClient).
//!
//! ### 5. The Fixture ([`backend`])
//! - **Role**: An in-memory LoopBack-style server actor used by the demo and
//!   the integration tests.
//!
//! ## 🚀 Quick Start
//!
//! ### Running the Demo
//!
//! ```bash
//! # Against the in-process backend
//! RUST_LOG=info cargo run
//!
//! # Against a running LoopBack server
//! LB_BASE_URL=http://localhost:3000/api RUST_LOG=debug cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod auth;
pub mod backend;
pub mod clients;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod model;
