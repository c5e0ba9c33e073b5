//! Tool configuration loading and schema definitions
//!
//! Settings that control how descriptors are resolved, as opposed to the
//! build descriptor itself.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
