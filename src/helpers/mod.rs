//! Helper Utilities
//!
//! Common utilities used across the crate.

mod format;
mod fs;
mod logging;

pub use format::*;
pub use fs::*;
pub use logging::*;
