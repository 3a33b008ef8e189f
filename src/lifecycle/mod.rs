//! Registry assembly, configuration and logging setup.

pub mod config;
pub mod services;
pub mod tracing;

pub use config::{ClientConfig, LogoutPolicy};
pub use services::{Services, ServicesBuilder};
