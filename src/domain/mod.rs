//! Domain Models
//!
//! Data types shared by the service, state and loader layers.

pub mod config;
pub mod dataset;
pub mod mode;
pub mod page;

pub use config::*;
pub use dataset::*;
pub use mode::*;
pub use page::*;
