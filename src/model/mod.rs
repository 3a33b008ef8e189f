//! Declarative model descriptions consumed by the resource factory.

pub mod definition;
pub mod params;

pub use definition::*;
pub use params::*;
