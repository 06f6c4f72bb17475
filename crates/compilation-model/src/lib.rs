//! Clipreel Compilation Model
//!
//! Defines the data contracts shared by the assembly engine and its callers:
//! - **Resolution:** canonical output frame sizes and the `"720p"`/`"1080p"` tags
//! - **Title:** bumper templates and placeholder substitution
//! - **Compilation:** the request record handed to the engine and the artifact it returns
//!
//! Durations are plain `f64` seconds throughout.

pub mod compilation;
pub mod filename;
pub mod resolution;
pub mod title;

pub use compilation::*;
pub use filename::*;
pub use resolution::*;
pub use title::*;
