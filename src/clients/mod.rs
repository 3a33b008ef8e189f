//! Typed wrappers around [`ResourceHandle`](crate::framework::ResourceHandle).

pub mod model_client;
pub mod user_client;

pub use model_client::*;
pub use user_client::*;
