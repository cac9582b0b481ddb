//! Type system utilities and aliases.
//!
//! - [`aliases`]: Type aliases for the shared-state wrappers used across crates.

pub mod aliases;

pub use aliases::*;
