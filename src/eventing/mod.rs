//! Eventing - Loader to view notifications

pub mod loader_event;

pub use loader_event::LoaderEvent;
