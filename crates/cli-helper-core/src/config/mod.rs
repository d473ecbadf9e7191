//! Configuration module for the CLI helper
//!
//! YAML configuration with serde defaults, an optional per-user file and
//! command-line overrides applied by the binary.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;

#[cfg(test)]
mod tests;
