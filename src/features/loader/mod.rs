//! Loader Feature
//!
//! Incremental loading of a prediction result set: the controller that
//! sequences page fetches, the browse/search mode machine, the scroll
//! sentinel, and the async session tying them to a page source.

pub mod controller;
pub mod mode;
pub mod sentinel;
pub mod session;

pub use controller::{FetchTicket, LoadTier, LoaderController, Settlement};
pub use mode::{ModeController, ModeState, ResetRequest};
pub use sentinel::{ScrollSentinel, SentinelGeometry};
pub use session::{LoaderHandle, spawn_loader};
