//! Generic resource runtime.
//!
//! This module provides the building blocks shared by every generated model
//! client: the transport seam, the result containers, and the factory that
//! wires them to a [`ModelDefinition`](crate::model::ModelDefinition).
//!
//! # Main Components
//!
//! - [`create_resource`] / [`ResourceHandle`] - the generated callable surface
//! - [`ResultContainer`], [`Instance`], [`Collection`] - `$promise`/`$resolved`/`$save`
//! - [`Transport`] - request seam, implemented by [`HttpTransport`]
//!
//! # Testing
//!
//! See the [`mock`] module for a scripted transport.

pub mod container;
pub mod core;
pub mod http;
pub mod mock;
pub mod transport;

pub use self::container::{settled, Callbacks, Collection, Promise, ResultContainer};
pub use self::core::{create_resource, Instance, Invocation, ResourceHandle};
pub use self::http::HttpTransport;
pub use self::transport::{Request, Response, Transport};
