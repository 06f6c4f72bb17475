//! Clipreel Common Utilities
//!
//! Shared infrastructure for all Clipreel crates:
//! - Error types and result aliases
//! - Configuration loading
//! - Tracing/logging initialization
//! - The persistent compilation counter

pub mod config;
pub mod counter;
pub mod error;
pub mod logging;

pub use config::*;
pub use counter::*;
pub use error::*;
