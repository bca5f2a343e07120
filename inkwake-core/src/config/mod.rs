//! Configuration types
//!
//! Device configuration is handed to the core already parsed. A copy is
//! kept in the cache record so a device without an external config keeps
//! working with the last one it was given.

pub mod types;

pub use types::*;
