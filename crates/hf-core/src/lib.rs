//! hf-core: shared error type, configuration, and asset domain types.
//!
//! This crate is the foundational dependency for all other hf-* crates,
//! providing a unified error type, the application configuration, and the
//! vocabulary of the asset lifecycle (names, states, on-disk layout).

pub mod asset;
pub mod config;
pub mod error;

// Re-export the most commonly used items at the crate root.
pub use asset::*;
pub use error::{Error, Result};
