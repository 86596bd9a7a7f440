//! Features - Vertical Feature Slices
//!
//! Each feature owns its controllers and the task that drives them.

pub mod loader;
